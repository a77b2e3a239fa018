//! Scanning the counts into offsets.

/// Outputs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Outputs {
    /// The exclusively scanned values.
    pub values: Vec<u32>,
    /// The total of scanned values.
    pub total: usize,
}

/// Scanning the values exclusively.
///
/// ## Examples
///
/// ```rust
/// use gausplat_rasterizer::render::gaussian_3d::kernel::scan;
///
/// let outputs = scan::add(&[3, 0, 2, 1]);
/// assert_eq!(outputs.values, vec![0, 3, 3, 5]);
/// assert_eq!(outputs.total, 6);
/// ```
pub fn add(values: &[u32]) -> Outputs {
    let mut total = 0_usize;
    let values = values
        .iter()
        .map(|value| {
            let offset = total as u32;
            total += *value as usize;
            offset
        })
        .collect();

    Outputs { values, total }
}
