use tracing::debug;

use crate::config::Markers;
use crate::error::DecodeError;
use crate::models::{NormalizedTable, SalesRecord};

/// Encabezados que sobreviven sin reparar (Big5 visto como Latin-1).
const MOJIBAKE_LABELS: [(&str, &str); 3] = [("©±¦W", "店名"), ("«~¦W", "品名"), ("°â¶q", "售量")];

/// Tabla cruda antes del mapeo de columnas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Índices de las tres columnas canónicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub store: usize,
    pub product: usize,
    pub quantity: usize,
}

/// Etiqueta con la forma mojibake reemplazada por la canónica. Basta con
/// que la contenga: tras Latin-1 pueden quedar bytes sueltos alrededor.
pub fn canonical_label(label: &str) -> String {
    let trimmed = label.trim();
    MOJIBAKE_LABELS
        .iter()
        .find(|(broken, _)| trimmed.contains(broken))
        .map(|(_, fixed)| fixed.to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// true si `text` contiene `label` o su forma mojibake conocida.
pub fn label_matches(text: &str, label: &str) -> bool {
    if label.is_empty() {
        return false;
    }
    text.contains(label)
        || MOJIBAKE_LABELS
            .iter()
            .any(|(broken, fixed)| *fixed == label && text.contains(broken))
}

/// Mapea columnas por nombre (店名/品名/售量) o, con 4+ columnas, por
/// posición fija 1, 2, 3.
pub fn map_columns(headers: &[String], markers: &Markers) -> Result<ColumnMap, DecodeError> {
    let labels: Vec<String> = headers.iter().map(|h| canonical_label(h)).collect();
    let find = |name: &str| labels.iter().position(|l| l == name);

    if let (Some(store), Some(quantity)) = (find(&markers.store), find(&markers.quantity)) {
        let product = find(&markers.product).ok_or_else(|| {
            DecodeError::ColumnMapping(format!(
                "found '{}' and '{}' but no '{}' column",
                markers.store, markers.quantity, markers.product
            ))
        })?;
        return Ok(ColumnMap { store, product, quantity });
    }

    if labels.len() >= 4 {
        debug!(columns = labels.len(), "header labels missing, using ordinal columns 1..3");
        return Ok(ColumnMap { store: 1, product: 2, quantity: 3 });
    }

    Err(DecodeError::ColumnMapping(format!(
        "expected '{}' and '{}' columns or at least 4 columns, got {:?}",
        markers.store, markers.quantity, labels
    )))
}

/// Convierte texto a cantidad: inválido, vacío, negativo o no finito -> 0.
pub fn coerce_quantity(raw: &str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Aplica el mapeo y limpia: descarta tiendas vacías y filas que repiten el encabezado.
pub fn normalize_rows(table: &RawTable, markers: &Markers) -> Result<NormalizedTable, DecodeError> {
    let map = map_columns(&table.headers, markers)?;
    let cell = |row: &Vec<String>, idx: usize| row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default();

    let records: NormalizedTable = table
        .rows
        .iter()
        .filter_map(|row| {
            let store = cell(row, map.store);
            if store.is_empty() || canonical_label(&store) == markers.store {
                return None;
            }
            Some(SalesRecord {
                store,
                product: cell(row, map.product),
                quantity: coerce_quantity(&cell(row, map.quantity)),
            })
        })
        .collect();
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn maps_by_name_in_any_order() {
        let map = map_columns(&headers(&[" 售量", "店名 ", "品名"]), &Markers::default()).unwrap();
        assert_eq!(map, ColumnMap { store: 1, product: 2, quantity: 0 });
    }

    #[test]
    fn maps_mojibake_labels() {
        let map = map_columns(&headers(&["©±¦W", "«~¦W", "°â¶q"]), &Markers::default()).unwrap();
        assert_eq!(map, ColumnMap { store: 0, product: 1, quantity: 2 });
    }

    #[test]
    fn ordinal_fallback_needs_four_columns() {
        let m = Markers::default();
        assert_eq!(
            map_columns(&headers(&["日期", "門市", "品項", "數量"]), &m).unwrap(),
            ColumnMap { store: 1, product: 2, quantity: 3 }
        );
        assert!(matches!(
            map_columns(&headers(&["a", "b", "c"]), &m),
            Err(DecodeError::ColumnMapping(_))
        ));
    }

    #[test]
    fn coercion_edge_cases() {
        assert_eq!(coerce_quantity("12"), 12.0);
        assert_eq!(coerce_quantity(" 3.5 "), 3.5);
        assert_eq!(coerce_quantity(""), 0.0);
        assert_eq!(coerce_quantity("abc"), 0.0);
        assert_eq!(coerce_quantity("-4"), 0.0);
        assert_eq!(coerce_quantity("NaN"), 0.0);
    }

    #[test]
    fn cleaning_drops_empty_and_repeated_header() {
        let table = RawTable {
            headers: headers(&["店名", "品名", "售量"]),
            rows: vec![
                vec!["北屯店".into(), "特幼".into(), "5".into()],
                vec!["".into(), "特幼".into(), "9".into()],
                vec!["店名".into(), "品名".into(), "售量".into()],
                vec!["彰草店".into(), "多粒".into(), "x".into()],
            ],
        };
        let records = normalize_rows(&table, &Markers::default()).unwrap();
        assert_eq!(
            records,
            vec![
                SalesRecord::new("北屯店", "特幼", 5.0),
                SalesRecord::new("彰草店", "多粒", 0.0),
            ]
        );
    }
}
