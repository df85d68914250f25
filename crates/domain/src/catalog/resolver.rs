use crate::order::OrderLine;
use crate::value_objects::Money;

use super::{CatalogSnapshot, Product};

/// Number of leading name characters compared by the fuzzy pass.
const FUZZY_PREFIX_CHARS: usize = 20;

/// Which rule identified the product for a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// `productId` named a catalog product.
    ProductId,
    /// `id` or `variantId` resolved through the variant index, or `id` was
    /// itself a product id.
    VariantId,
    /// Name containment against the catalog.
    FuzzyName,
}

/// A product matched to an order line.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedProduct<'a> {
    pub product: &'a Product,
    pub matched_by: MatchKind,
}

/// Attributes order line items to catalog products.
///
/// Order lines written over the years carry product references in
/// different fields, and some carry only a display name. Rules are tried
/// in priority order and the first hit wins:
///
/// 1. `productId` as a product id
/// 2. `id`, then `variantId`, through the variant index (`id` may also be a
///    product id)
/// 3. the first [`FUZZY_PREFIX_CHARS`] characters of the name, matched
///    case-insensitively by containment in either direction, scanning
///    products in ascending id order
///
/// Resolution is a pure read of the snapshot.
#[derive(Debug, Clone, Copy)]
pub struct LineItemProductResolver<'a> {
    catalog: &'a CatalogSnapshot,
}

impl<'a> LineItemProductResolver<'a> {
    pub fn new(catalog: &'a CatalogSnapshot) -> Self {
        Self { catalog }
    }

    /// Resolves the product for a line, or `None` when nothing matches.
    pub fn resolve(&self, line: &OrderLine) -> Option<ResolvedProduct<'a>> {
        if let Some(product) = non_empty(line.product_id.as_deref()).and_then(|id| self.catalog.get(id))
        {
            return Some(ResolvedProduct {
                product,
                matched_by: MatchKind::ProductId,
            });
        }

        if let Some(product) = self.by_reference(line) {
            return Some(ResolvedProduct {
                product,
                matched_by: MatchKind::VariantId,
            });
        }

        self.by_name(&line.name).map(|product| ResolvedProduct {
            product,
            matched_by: MatchKind::FuzzyName,
        })
    }

    /// Purchase cost per unit for a line; zero when the product is unknown.
    pub fn unit_cost(&self, line: &OrderLine) -> Money {
        self.resolve(line)
            .map(|resolved| resolved.product.purchase_cost)
            .unwrap_or_default()
    }

    fn by_reference(&self, line: &OrderLine) -> Option<&'a Product> {
        let catalog = self.catalog;
        if let Some(id) = non_empty(line.id.as_deref()) {
            if let Some(product) = catalog.product_for_variant(id).or_else(|| catalog.get(id)) {
                return Some(product);
            }
        }
        non_empty(line.variant_id.as_deref()).and_then(|vid| catalog.product_for_variant(vid))
    }

    fn by_name(&self, name: &str) -> Option<&'a Product> {
        let needle: String = name
            .trim()
            .chars()
            .take(FUZZY_PREFIX_CHARS)
            .collect::<String>()
            .to_lowercase();
        if needle.is_empty() {
            return None;
        }

        self.catalog.products().find(|product| {
            let candidate = product.name.trim().to_lowercase();
            !candidate.is_empty() && (candidate.contains(&needle) || needle.contains(&candidate))
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
