//! Human readable size normalization

use crate::constants::units::SIZE_UNITS_MB;
use crate::errors::{KmlError, KmlResult};

/// Convert a size such as `"52,2 GB"` into megabytes
///
/// Accepts `.` or `,` as decimal separator, optional whitespace before the
/// unit and the units GB, MB and KB in any case.
///
/// # Errors
///
/// Returns `KmlError::UnsupportedSizeUnit` for any other suffix and
/// `KmlError::InvalidValue` when the number part does not parse.
pub fn normalize_size(size: &str) -> KmlResult<f64> {
    let normalized = size.replace(',', ".").trim().to_lowercase();

    for (unit, factor) in SIZE_UNITS_MB {
        if let Some(number) = normalized.strip_suffix(unit) {
            let value: f64 = number.trim().parse().map_err(|_| KmlError::InvalidValue {
                field: "download_size".to_string(),
                value: size.to_string(),
            })?;
            return Ok(value * factor);
        }
    }

    Err(KmlError::UnsupportedSizeUnit {
        value: size.to_string(),
    })
}
