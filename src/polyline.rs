//! Encoded polyline decoding.
//!
//! Routes arrive from the activity API as compact polyline strings: each
//! coordinate is stored as a pair of zig-zag-encoded deltas against a running
//! latitude/longitude, split into 6-bit groups offset into printable ASCII,
//! with the 1e5 scaling used by mapping-route encodings.

use crate::error::{MetricsError, Result};
use crate::GpsPoint;

/// Lowest byte of the encoding alphabet (`'?'`).
const ALPHABET_MIN: u8 = 63;
/// Highest byte of the encoding alphabet (`'~'`).
const ALPHABET_MAX: u8 = 126;

/// Decode an encoded polyline string into GPS points.
///
/// An empty string decodes to an empty route; that is not an error. Malformed
/// input (truncated mid-delta, bytes outside the encoding alphabet) fails
/// explicitly so the caller can treat the activity as having no route.
///
/// # Example
/// ```
/// use route_metrics::decode_polyline;
///
/// let points = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(points.len(), 3);
/// assert_eq!(points[0].latitude, 38.5);
/// assert_eq!(points[0].longitude, -120.2);
/// ```
pub fn decode_polyline(encoded: &str) -> Result<Vec<GpsPoint>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        lat += decode_delta(bytes, &mut index)?;
        lng += decode_delta(bytes, &mut index)?;
        points.push(GpsPoint::new(lat as f64 / 1e5, lng as f64 / 1e5));
    }

    Ok(points)
}

/// Decode one signed delta starting at `*index`, advancing the cursor.
///
/// Reads 6-bit groups (offset by 63) until a group's continuation bit is
/// clear, then un-zig-zags the accumulated value.
fn decode_delta(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut shift = 0u32;
    let mut accum: u64 = 0;

    loop {
        let byte = *bytes
            .get(*index)
            .ok_or(MetricsError::TruncatedPolyline { index: *index })?;
        if !(ALPHABET_MIN..=ALPHABET_MAX).contains(&byte) {
            return Err(MetricsError::InvalidPolylineByte {
                byte,
                index: *index,
            });
        }
        // A legitimate delta never needs more groups than the accumulator
        // holds; past that the input is garbage.
        if shift >= u64::BITS {
            return Err(MetricsError::PolylineOverflow { index: *index });
        }

        let group = (byte - ALPHABET_MIN) as u64;
        *index += 1;
        accum |= (group & 0x1f) << shift;
        shift += 5;

        if group < 0x20 {
            break;
        }
    }

    // Zig-zag: odd values are bitwise-complemented shifts of negative deltas.
    let delta = if accum & 1 == 1 {
        !(accum >> 1) as i64
    } else {
        (accum >> 1) as i64
    };
    Ok(delta)
}

/// Encode GPS points into polyline text. Test fixture builder only; the
/// production pipeline never re-encodes.
#[cfg(test)]
pub(crate) fn encode_polyline(points: &[GpsPoint]) -> String {
    let mut out = String::new();
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for p in points {
        let lat = (p.latitude * 1e5).round() as i64;
        let lng = (p.longitude * 1e5).round() as i64;
        encode_delta(lat - prev_lat, &mut out);
        encode_delta(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

#[cfg(test)]
fn encode_delta(delta: i64, out: &mut String) {
    let mut value = (delta << 1) as u64;
    if delta < 0 {
        value = !value;
    }
    while value >= 0x20 {
        out.push((((value & 0x1f) | 0x20) as u8 + ALPHABET_MIN) as char);
        value >>= 5;
    }
    out.push((value as u8 + ALPHABET_MIN) as char);
}
