//! Combinación de tablas y agregación tienda × producto.
//!
//! Matching de productos contra el catálogo:
//! - `match_catalog_key`: la clave canónica es substring de la etiqueta
//!   (agregación de datos fuente).
//! - `fuzzy_match_key`: contención en cualquier dirección (etiquetas de la
//!   plantilla, que pueden ser más cortas que la clave).
//!
//! En ambos casos gana la primera clave en el orden del catálogo. Con
//! claves anidadas ("大口" ⊂ "幼大口") el orden del catálogo decide.

use indexmap::IndexMap;
use std::collections::VecDeque;
use tracing::debug;

use crate::models::{CombinedTable, NormalizedTable, ProductCatalog, StoreProductAggregate};

/// Primera clave del catálogo contenida en `label`.
pub fn match_catalog_key<'a>(label: &str, catalog: &'a ProductCatalog) -> Option<&'a str> {
    catalog
        .keys()
        .find(|key| !key.is_empty() && label.contains(key.as_str()))
        .map(|k| k.as_str())
}

/// Primera clave tal que la clave contiene a `label` o `label` contiene a la clave.
pub fn fuzzy_match_key<'a>(label: &str, catalog: &'a ProductCatalog) -> Option<&'a str> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    catalog
        .keys()
        .find(|key| !key.is_empty() && (label.contains(key.as_str()) || key.contains(label)))
        .map(|k| k.as_str())
}

/// Nombre canónico de un producto fuente; sin coincidencia se conserva la etiqueta cruda.
pub fn canonical_product(product: &str, catalog: &ProductCatalog) -> String {
    match_catalog_key(product, catalog)
        .map(|k| k.to_string())
        .unwrap_or_else(|| product.to_string())
}

/// Concatena las tablas en orden de subida, sin validar ni deduplicar.
pub fn combine(tables: Vec<NormalizedTable>) -> CombinedTable {
    tables.into_iter().flatten().collect()
}

/// Suma cantidades por (tienda, producto canónico).
pub fn aggregate(table: &CombinedTable, catalog: &ProductCatalog) -> StoreProductAggregate {
    let mut result: StoreProductAggregate = IndexMap::new();
    for record in table {
        let key = canonical_product(&record.product, catalog);
        let slot = result
            .entry(record.store.trim().to_string())
            .or_default()
            .entry(key)
            .or_insert(0.0);
        *slot += record.quantity;
    }
    debug!(stores = result.len(), records = table.len(), "aggregated sales");
    result
}

/// Colas por producto canónico en el orden de la tabla combinada
/// (relleno secuencial: no se mira la tienda).
pub fn product_queues(table: &CombinedTable, catalog: &ProductCatalog) -> IndexMap<String, VecDeque<f64>> {
    let mut queues: IndexMap<String, VecDeque<f64>> = IndexMap::new();
    for record in table {
        queues
            .entry(canonical_product(&record.product, catalog))
            .or_default()
            .push_back(record.quantity);
    }
    queues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SalesRecord;

    fn catalog(entries: &[(&str, u32)]) -> ProductCatalog {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn raw_label_kept_when_unmatched() {
        let cat = catalog(&[("特幼", 116)]);
        assert_eq!(canonical_product("檳榔禮盒", &cat), "檳榔禮盒");
        assert_eq!(canonical_product("特幼(包)", &cat), "特幼");
    }

    #[test]
    fn fuzzy_is_bidirectional() {
        let cat = catalog(&[("雙子星", 0)]);
        assert_eq!(fuzzy_match_key("雙子", &cat), Some("雙子星"));
        assert_eq!(fuzzy_match_key("雙子星特價", &cat), Some("雙子星"));
        assert_eq!(fuzzy_match_key("", &cat), None);
    }

    #[test]
    fn duplicates_are_additive() {
        let cat = catalog(&[("多粒", 146)]);
        let table = vec![
            SalesRecord::new("北屯店", "多粒", 3.0),
            SalesRecord::new("北屯店", "多粒", 4.0),
        ];
        let agg = aggregate(&table, &cat);
        assert_eq!(agg["北屯店"]["多粒"], 7.0);
    }

    #[test]
    fn queues_follow_source_order() {
        let cat = catalog(&[("特幼", 116)]);
        let table = vec![
            SalesRecord::new("A", "特幼", 1.0),
            SalesRecord::new("B", "其他", 9.0),
            SalesRecord::new("C", "特幼", 2.0),
        ];
        let q = product_queues(&table, &cat);
        assert_eq!(q["特幼"], VecDeque::from(vec![1.0, 2.0]));
        assert_eq!(q["其他"], VecDeque::from(vec![9.0]));
    }
}
