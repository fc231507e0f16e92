//! Tile coordinates encoded in file names, e.g. `N47W123.hgt` or
//! `USGS_13_n48w123_20240327.tif`.

use std::path::Path;

/// Signed whole-degree latitude and longitude named by a tile file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileCorner {
    pub lat: f64,
    pub lon: f64,
}

/// Find the first `[ns]DD[ew]DDD` token in the file name, case-insensitive.
pub fn parse_tile_name(filename: &str) -> Option<TileCorner> {
    let name = Path::new(filename).file_name()?.to_str()?.to_ascii_lowercase();
    let bytes = name.as_bytes();

    for start in 0..bytes.len() {
        let is_north = match bytes[start] {
            b'n' => true,
            b's' => false,
            _ => continue,
        };
        // A hemisphere letter inside a word ("usgs") is not a tile token.
        if start > 0 && bytes[start - 1].is_ascii_alphanumeric() {
            continue;
        }

        let lat_end = digits_end(bytes, start + 1);
        if lat_end == start + 1 {
            continue;
        }
        let is_west = match bytes.get(lat_end) {
            Some(b'w') => true,
            Some(b'e') => false,
            _ => continue,
        };
        let lon_end = digits_end(bytes, lat_end + 1);
        if lon_end == lat_end + 1 {
            continue;
        }

        let lat: f64 = name[start + 1..lat_end].parse().ok()?;
        let lon: f64 = name[lat_end + 1..lon_end].parse().ok()?;
        if lat > 90.0 || lon > 180.0 {
            return None;
        }

        return Some(TileCorner {
            lat: if is_north { lat } else { -lat },
            lon: if is_west { -lon } else { lon },
        });
    }
    None
}

fn digits_end(bytes: &[u8], from: usize) -> usize {
    from + bytes[from.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count()
}
