//! Decodificación de texto con estrategias ordenadas y reparación de mojibake.
//!
//! Los terminales exportan Big5, pero a veces el archivo pasó por una
//! herramienta que leyó los bytes como Latin-1 y los volvió a guardar en
//! UTF-8 ("店名" termina como "©±¦W"). Se prueba en orden:
//! 1. UTF-8 (estricto). Si el texto trae huellas de mojibake se revierte:
//!    texto -> bytes Latin-1 -> Big5.
//! 2. Big5 tolerante (secuencias inválidas -> U+FFFD).
//! 3. Latin-1, que nunca falla.
//!
//! Una estrategia "gana" sólo si además se encuentra la línea de encabezado.

use encoding_rs::{BIG5, UTF_8};
use std::fmt;
use tracing::{debug, warn};

use crate::config::{HeaderStrategy, Markers, ReportConfig};
use crate::decode::columns::{label_matches, RawTable};
use crate::error::DecodeError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const PREVIEW_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    Utf8,
    Big5,
    Latin1,
}

impl DecodeStrategy {
    pub const ORDER: [DecodeStrategy; 3] = [DecodeStrategy::Utf8, DecodeStrategy::Big5, DecodeStrategy::Latin1];

    pub fn name(self) -> &'static str {
        match self {
            DecodeStrategy::Utf8 => "utf-8",
            DecodeStrategy::Big5 => "big5",
            DecodeStrategy::Latin1 => "latin-1",
        }
    }

    /// Decodifica `bytes` con esta hipótesis.
    pub fn decode(self, bytes: &[u8], fingerprints: &[String]) -> Result<String, DecodeError> {
        match self {
            DecodeStrategy::Utf8 => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                let text = UTF_8
                    .decode_without_bom_handling_and_without_replacement(body)
                    .ok_or(DecodeError::InvalidEncoding { strategy: self.name() })?;
                if has_mojibake(&text, fingerprints) {
                    debug!("mojibake fingerprint found, re-decoding as big5");
                    Ok(repair_mojibake(&text))
                } else {
                    Ok(text.into_owned())
                }
            }
            DecodeStrategy::Big5 => {
                let (text, had_errors) = BIG5.decode_without_bom_handling(bytes);
                if had_errors {
                    debug!("big5 decode replaced malformed sequences");
                }
                Ok(text.into_owned())
            }
            DecodeStrategy::Latin1 => Ok(encoding_rs::mem::decode_latin1(bytes).into_owned()),
        }
    }
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn has_mojibake(text: &str, fingerprints: &[String]) -> bool {
    fingerprints.iter().any(|f| !f.is_empty() && text.contains(f.as_str()))
}

/// Revierte Big5 -> Latin-1 -> UTF-8. Los caracteres fuera de Latin-1 no
/// pueden venir del daño y se descartan; los bytes que Big5 no entiende
/// quedan como U+FFFD.
pub fn repair_mojibake(text: &str) -> String {
    let bytes: Vec<u8> = text
        .chars()
        .filter_map(|c| u8::try_from(u32::from(c)).ok())
        .collect();
    let (repaired, _) = BIG5.decode_without_bom_handling(&bytes);
    repaired.into_owned()
}

/// Índice de la primera línea (dentro de `scan_lines`) con las etiquetas de tienda y cantidad.
pub fn find_header_line(text: &str, markers: &Markers, scan_lines: usize) -> Option<usize> {
    text.lines()
        .take(scan_lines)
        .position(|line| label_matches(line, &markers.store) && label_matches(line, &markers.quantity))
}

/// Separador más frecuente en la línea de encabezado (coma por defecto).
pub fn sniff_delimiter(header_line: &str) -> u8 {
    [b',', b'\t', b';']
        .into_iter()
        .map(|d| (d, header_line.bytes().filter(|b| *b == d).count()))
        .filter(|(_, n)| *n > 0)
        .max_by_key(|(_, n)| *n)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// Parsea texto delimitado. Con `skip_malformed` las filas con más campos
/// que el encabezado, o que el lector rechaza, se saltan en lugar de
/// abortar el archivo.
pub fn parse_delimited(text: &str, delimiter: u8, skip_malformed: bool) -> Result<RawTable, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) if skip_malformed && record.len() > headers.len() => {
                warn!(line = idx + 2, fields = record.len(), expected = headers.len(), "skipping line with extra fields");
            }
            Ok(record) => rows.push(record.iter().map(|f| f.to_string()).collect()),
            Err(e) if skip_malformed => {
                warn!(line = idx + 2, error = %e, "skipping malformed line");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(RawTable { headers, rows })
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Texto recortado desde la línea de encabezado según la estrategia configurada.
fn select_table_text(text: &str, config: &ReportConfig) -> Option<String> {
    match config.header_strategy {
        HeaderStrategy::SearchHeaderLine => {
            let idx = find_header_line(text, &config.markers, config.header_scan_lines)?;
            Some(text.lines().skip(idx).collect::<Vec<_>>().join("\n"))
        }
        HeaderStrategy::SeparatorFilter => {
            let kept: Vec<&str> = text
                .lines()
                .filter(|line| {
                    let sep = sniff_delimiter(line);
                    line.bytes().filter(|b| *b == sep).count() >= 2
                })
                .collect();
            if kept.is_empty() { None } else { Some(kept.join("\n")) }
        }
    }
}

/// Prueba las estrategias en orden y devuelve la tabla cruda de la primera
/// que produce un encabezado utilizable, junto con la estrategia usada.
pub fn decode_text_table(bytes: &[u8], config: &ReportConfig) -> Result<(RawTable, DecodeStrategy), DecodeError> {
    let mut tried: Vec<&'static str> = Vec::new();
    let mut last_preview = String::new();

    for strategy in DecodeStrategy::ORDER {
        tried.push(strategy.name());
        let text = match strategy.decode(bytes, &config.mojibake_fingerprints) {
            Ok(t) => t,
            Err(e) => {
                debug!(%strategy, error = %e, "decode strategy failed");
                continue;
            }
        };
        last_preview = preview(&text);

        let Some(table_text) = select_table_text(&text, config) else {
            debug!(%strategy, "no header line with this decoding");
            continue;
        };
        let delimiter = table_text.lines().next().map(sniff_delimiter).unwrap_or(b',');
        let skip_malformed = config.header_strategy == HeaderStrategy::SeparatorFilter;
        let table = parse_delimited(&table_text, delimiter, skip_malformed)?;
        return Ok((table, strategy));
    }

    Err(DecodeError::NoHeaderLine {
        strategy: tried.join(" -> "),
        scanned: config.header_scan_lines,
        preview: last_preview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprints() -> Vec<String> {
        ReportConfig::default().mojibake_fingerprints
    }

    /// Simula el daño: Big5 leído como Latin-1 y guardado en UTF-8.
    fn damage(text: &str) -> Vec<u8> {
        let (big5, _, _) = BIG5.encode(text);
        encoding_rs::mem::decode_latin1(&big5).into_owned().into_bytes()
    }

    #[test]
    fn utf8_repairs_fingerprinted_text() {
        let bytes = damage("店名,品名,售量");
        let text = DecodeStrategy::Utf8.decode(&bytes, &fingerprints()).unwrap();
        assert_eq!(text, "店名,品名,售量");
    }

    #[test]
    fn utf8_rejects_big5_bytes() {
        let (big5, _, _) = BIG5.encode("店名");
        assert!(DecodeStrategy::Utf8.decode(&big5, &fingerprints()).is_err());
        assert_eq!(DecodeStrategy::Big5.decode(&big5, &fingerprints()).unwrap(), "店名");
    }

    #[test]
    fn header_search_skips_banner() {
        let text = "匯出報表\n2024/01/01\n店名,品名,售量\nA,B,1";
        assert_eq!(find_header_line(text, &Markers::default(), 20), Some(2));
        assert_eq!(find_header_line(text, &Markers::default(), 2), None);
    }

    #[test]
    fn delimiter_sniffing() {
        assert_eq!(sniff_delimiter("店名\t品名\t售量"), b'\t');
        assert_eq!(sniff_delimiter("店名,品名,售量"), b',');
        assert_eq!(sniff_delimiter("店名"), b',');
    }

    #[test]
    fn separator_filter_drops_lines_without_separators() {
        let config = ReportConfig {
            header_strategy: HeaderStrategy::SeparatorFilter,
            ..ReportConfig::default()
        };
        let bytes = "報表\n店名,品名,售量\n北屯店,特幼,3\n無效\n".as_bytes();
        let (table, strategy) = decode_text_table(bytes, &config).unwrap();
        assert_eq!(strategy, DecodeStrategy::Utf8);
        assert_eq!(table.headers, vec!["店名", "品名", "售量"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn separator_filter_skips_lines_with_extra_fields() {
        let config = ReportConfig {
            header_strategy: HeaderStrategy::SeparatorFilter,
            ..ReportConfig::default()
        };
        let bytes = "店名,品名,售量\n北屯店,特幼,3\n彰草店,多粒,2,備註,x\n員林店,幼菁,\n".as_bytes();
        let (table, _) = decode_text_table(bytes, &config).unwrap();
        assert_eq!(
            table.rows,
            vec![
                vec!["北屯店".to_string(), "特幼".into(), "3".into()],
                vec!["員林店".to_string(), "幼菁".into(), "".into()],
            ]
        );
    }

    #[test]
    fn header_search_keeps_lines_with_extra_fields() {
        let table = parse_delimited("店名,品名,售量\n彰草店,多粒,2,備註\n", b',', false).unwrap();
        assert_eq!(table.rows.len(), 1);
    }
}
