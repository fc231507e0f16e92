//! Packed degrees-minutes-seconds parsing.
//!
//! DTED and USGS DEM headers store angles as `DDDMMSS[.ss]` followed (or
//! preceded) by a hemisphere letter, e.g. `1223015.5W` or `0470000N`.

/// Parse a packed `DDDMMSS.ss[NSEW]` string into signed decimal degrees.
///
/// South and west hemispheres are negative. The degree part may have any
/// number of digits; minutes and seconds are always two digits each.
/// Returns `None` for malformed input or out-of-range minutes/seconds.
pub fn parse_dms(text: &str) -> Option<f64> {
    let text = text.trim();
    let (body, negative) = split_hemisphere(text)?;

    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (body, None),
    };

    if int_part.len() < 5 || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let split = int_part.len() - 4;
    let degrees: f64 = int_part[..split].parse().ok()?;
    let minutes: f64 = int_part[split..split + 2].parse().ok()?;
    let mut seconds: f64 = int_part[split + 2..].parse().ok()?;

    if let Some(frac) = frac_part {
        if !frac.is_empty() {
            if !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            seconds += format!("0.{}", frac).parse::<f64>().ok()?;
        }
    }

    if minutes >= 60.0 || seconds >= 60.0 {
        return None;
    }

    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    Some(if negative { -value } else { value })
}

/// Whether the text ends or starts with a hemisphere letter.
pub fn has_hemisphere(text: &str) -> bool {
    let text = text.trim();
    matches!(
        (text.chars().next(), text.chars().last()),
        (Some('N' | 'S' | 'E' | 'W' | 'n' | 's' | 'e' | 'w'), _)
            | (_, Some('N' | 'S' | 'E' | 'W' | 'n' | 's' | 'e' | 'w'))
    )
}

fn split_hemisphere(text: &str) -> Option<(&str, bool)> {
    let first = text.chars().next()?;
    let last = text.chars().last()?;

    if let Some(negative) = hemisphere_sign(last) {
        return Some((text[..text.len() - 1].trim(), negative));
    }
    if let Some(negative) = hemisphere_sign(first) {
        return Some((text[1..].trim(), negative));
    }

    // Unsigned or explicitly signed packed value without a letter.
    match text.strip_prefix('-') {
        Some(rest) => Some((rest, true)),
        None => Some((text.strip_prefix('+').unwrap_or(text), false)),
    }
}

fn hemisphere_sign(c: char) -> Option<bool> {
    match c.to_ascii_uppercase() {
        'N' | 'E' => Some(false),
        'S' | 'W' => Some(true),
        _ => None,
    }
}
