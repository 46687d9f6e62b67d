//! Pure quote computation from a completed job and the user's selections.

use crate::catalog::QualityLevel;
use crate::jobs::{JobResult, PriceInfo};

/// Flat surcharge for multi-color prints, applied client-side; the backend
/// never quotes this component.
pub const MULTI_COLOR_SURCHARGE: f64 = 15.0;

/// Multiplier applied when the quantity is several parts of one item.
pub const MULTI_PART_DISCOUNT: f64 = 0.9;

/// Price breakdown for one configured print.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuoteDetails {
    pub base_price: f64,
    pub color_modifier: f64,
    pub material_modifier: f64,
    pub multi_color_modifier: f64,
    pub quality_modifier: f64,
    /// Unit price: sum of the five components above.
    pub total: f64,
    /// Final payable amount after quantity and the multi-part discount.
    pub total_with_quantity: f64,
}

/// Why a quote could not be produced for a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuoteError {
    /// Job completed but the backend attached no pricing data. Distinct from
    /// a failed job; the quote view must show a hard error, not a price.
    MissingPriceInfo,
}

impl std::fmt::Display for QuoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteError::MissingPriceInfo => {
                write!(f, "no pricing data was returned for this model")
            }
        }
    }
}

impl std::error::Error for QuoteError {}

/// Combine the server-computed cost components with the client-side options.
///
/// `base_price_with_markup` is consumed as-is; markup is never recomputed
/// here. The discount needs both the multi-part flag and a quantity above one.
pub fn compute_quote(
    price: &PriceInfo,
    is_multi_color: bool,
    quantity: u32,
    is_multi_part: bool,
) -> QuoteDetails {
    let base_price = price.base_price_with_markup;
    let color_modifier = price.color_addon;
    let material_modifier = price.material_modifier;
    let multi_color_modifier = if is_multi_color {
        MULTI_COLOR_SURCHARGE
    } else {
        0.0
    };
    let quality_modifier = price.quality_modifier;

    let total =
        base_price + color_modifier + material_modifier + multi_color_modifier + quality_modifier;

    let mut total_with_quantity = total * f64::from(quantity);
    if is_multi_part && quantity > 1 {
        total_with_quantity *= MULTI_PART_DISCOUNT;
    }

    QuoteDetails {
        base_price,
        color_modifier,
        material_modifier,
        multi_color_modifier,
        quality_modifier,
        total,
        total_with_quantity,
    }
}

/// Quote a completed job's result, refusing results without pricing data.
pub fn quote_for_result(
    result: &JobResult,
    is_multi_color: bool,
    quantity: u32,
    is_multi_part: bool,
) -> Result<QuoteDetails, QuoteError> {
    let price = result.price_info.ok_or(QuoteError::MissingPriceInfo)?;
    Ok(compute_quote(&price, is_multi_color, quantity, is_multi_part))
}

/// Display-only modifier from the catalog quality table. Unknown ids map to
/// 0; the backend-reported value stays authoritative once a quote exists.
pub fn display_quality_modifier(levels: &[QualityLevel], quality_id: &str) -> f64 {
    levels
        .iter()
        .find(|l| l.id == quality_id)
        .map(|l| l.price_modifier)
        .unwrap_or(0.0)
}

/// Render a currency amount. The only place rounding happens.
pub fn format_currency(amount: f64) -> String {
    format!("${amount:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_quality_levels;

    fn price(base: f64, color: f64, material: f64, quality: f64) -> PriceInfo {
        PriceInfo {
            base_price_with_markup: base,
            color_addon: color,
            material_modifier: material,
            quality_modifier: quality,
            ..PriceInfo::default()
        }
    }

    #[test]
    fn test_multi_part_discount_with_quantity() {
        let q = compute_quote(&price(20.0, 5.0, 15.0, 10.0), false, 3, true);
        assert_eq!(q.total, 50.0);
        assert_eq!(q.total_with_quantity, 135.0);
    }

    #[test]
    fn test_multi_part_alone_has_no_effect_at_quantity_one() {
        let q = compute_quote(&price(20.0, 5.0, 15.0, 10.0), false, 1, true);
        assert_eq!(q.total_with_quantity, 50.0);
    }

    #[test]
    fn test_multi_color_surcharge() {
        let q = compute_quote(&price(20.0, 5.0, 15.0, 10.0), true, 3, true);
        assert_eq!(q.total, 65.0);
        assert_eq!(q.total_with_quantity, 175.5);
    }

    #[test]
    fn test_quantity_without_multi_part_is_plain_multiplication() {
        let q = compute_quote(&price(20.0, 5.0, 15.0, 10.0), false, 4, false);
        assert_eq!(q.total_with_quantity, 200.0);
    }

    #[test]
    fn test_total_is_sum_of_components() {
        // Algebraic identity over a grid of component values, including the
        // negative draft-quality modifier.
        let bases = [0.0, 12.5, 20.0, 99.99];
        let colors = [0.0, 5.0, 18.0];
        let materials = [0.0, 15.0, 25.0];
        let qualities = [-5.0, 0.0, 10.0, 15.0];
        for b in bases {
            for c in colors {
                for m in materials {
                    for ql in qualities {
                        for multi in [false, true] {
                            let q = compute_quote(&price(b, c, m, ql), multi, 2, false);
                            let expected = q.base_price
                                + q.color_modifier
                                + q.material_modifier
                                + q.multi_color_modifier
                                + q.quality_modifier;
                            assert!((q.total - expected).abs() < 1e-9);
                            assert!((q.total_with_quantity - q.total * 2.0).abs() < 1e-9);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_absent_backend_fields_default_to_zero() {
        let q = compute_quote(&PriceInfo::default(), false, 1, false);
        assert_eq!(q.total, 0.0);
        assert_eq!(q.total_with_quantity, 0.0);
    }

    #[test]
    fn test_missing_price_info_is_a_quote_error() {
        let result = JobResult {
            filament_used_g: 10.0,
            estimated_time: "1h".into(),
            has_supports: false,
            size: Default::default(),
            volume_cm3: 5.0,
            fill_density: 0.15,
            price_info: None,
        };
        assert_eq!(
            quote_for_result(&result, false, 1, false),
            Err(QuoteError::MissingPriceInfo)
        );
    }

    #[test]
    fn test_display_modifier_unknown_quality_defaults_to_zero() {
        let levels = default_quality_levels();
        assert_eq!(display_quality_modifier(&levels, "draft"), -5.0);
        assert_eq!(display_quality_modifier(&levels, "ultra"), 15.0);
        assert_eq!(display_quality_modifier(&levels, "nonexistent"), 0.0);
        assert_eq!(display_quality_modifier(&[], "standard"), 0.0);
    }

    #[test]
    fn test_rounding_only_at_render() {
        let q = compute_quote(&price(0.10, 0.20, 0.0, 0.0), false, 3, false);
        // Accumulation keeps full precision; formatting rounds.
        assert!((q.total_with_quantity - 0.9).abs() < 1e-9);
        assert_eq!(format_currency(q.total_with_quantity), "$0.90");
        assert_eq!(format_currency(175.499), "$175.50");
    }
}
