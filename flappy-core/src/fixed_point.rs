//! Integer helpers for the fixed-point coordinate system.
//!
//! Formats:
//! - `*_x16` / `*_y16`: pixel coordinates multiplied by `UNIT` (16)
//! - tiles: `TILE_SIZE` (32) pixels per tile
//!
//! Division always rounds toward negative infinity so that positions above
//! the screen top (negative y) map to the tile they are actually in.

use crate::constants::{TILE_SIZE, UNIT};

/// Floor division. `y` must be non-zero.
#[inline]
pub const fn floor_div(x: i32, y: i32) -> i32 {
    let q = x / y;
    if x % y != 0 && ((x < 0) != (y < 0)) {
        q - 1
    } else {
        q
    }
}

/// Floor modulo; the result has the sign of `y`.
#[inline]
pub const fn floor_mod(x: i32, y: i32) -> i32 {
    x - floor_div(x, y) * y
}

#[inline]
pub const fn to_pixels(v16: i32) -> i32 {
    floor_div(v16, UNIT)
}

#[inline]
pub const fn pixels_to_tiles(px: i32) -> i32 {
    floor_div(px, TILE_SIZE)
}

#[inline]
pub const fn to_tiles(v16: i32) -> i32 {
    pixels_to_tiles(to_pixels(v16))
}
