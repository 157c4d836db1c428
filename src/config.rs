use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::models::ProductCatalog;

/// Plantilla por defecto (relativa al directorio de trabajo)
pub const DEFAULT_TEMPLATE_PATH: &str = "templates/檳榔銷售統計.xlsx";

/// Nombre fijo del archivo descargable
pub const DEFAULT_OUTPUT_NAME: &str = "已填寫_檳榔銷售統計.xlsx";

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Catálogo por defecto del formulario de configuración (粒數 por paquete).
pub fn default_catalog() -> ProductCatalog {
    [
        ("特幼", 116),
        ("幼大口", 50),
        ("多粒", 146),
        ("多大口", 137),
        ("幼菁", 36),
        ("雙子星", 0),
        ("多菁", 0),
        ("普通", 0),
    ]
    .into_iter()
    .map(|(name, units)| (name.to_string(), units))
    .collect()
}

/// Textos que la inferencia de layout busca dentro de las celdas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Markers {
    pub store: String,
    pub product: String,
    pub quantity: String,
    pub pack_count: String,
    pub unit_count: String,
    pub unit_summary: String,
    pub grand_total_units: String,
    pub grand_total_packs: String,
    /// Filas cuya etiqueta contiene alguno de estos textos son resúmenes, no datos
    pub summary_markers: Vec<String>,
}

impl Default for Markers {
    fn default() -> Self {
        Markers {
            store: "店名".to_string(),
            product: "品名".to_string(),
            quantity: "售量".to_string(),
            pack_count: "銷售包數".to_string(),
            unit_count: "銷售粒數".to_string(),
            unit_summary: "粒數統計".to_string(),
            grand_total_units: "總粒數".to_string(),
            grand_total_packs: "總包數".to_string(),
            summary_markers: vec![
                "合計".to_string(),
                "總計".to_string(),
                "小計".to_string(),
                "銷售".to_string(),
            ],
        }
    }
}

impl Markers {
    /// true si la etiqueta pertenece a una fila de resumen (total, 包數, 粒數...)
    pub fn is_summary_label(&self, label: &str) -> bool {
        self.summary_markers
            .iter()
            .chain([
                &self.pack_count,
                &self.unit_count,
                &self.unit_summary,
                &self.grand_total_units,
                &self.grand_total_packs,
            ])
            .any(|m| !m.is_empty() && label.contains(m.as_str()))
    }
}

/// Cómo se asignan las cantidades a las filas de la plantilla.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStrategy {
    /// Busca la cantidad por nombre de tienda + producto
    #[default]
    LookupByStore,
    /// Ignora el nombre de tienda: pone a cero y consume una cola por producto
    /// en el orden de la tabla combinada
    SequentialFill,
}

/// Cómo se localiza el encabezado en los archivos de texto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStrategy {
    /// Busca la primera línea con 店名 y 售量 dentro de la ventana de escaneo
    #[default]
    SearchHeaderLine,
    /// Descarta líneas con menos de dos separadores y salta filas mal formadas
    SeparatorFilter,
}

/// Cómo se descubren los bloques repetidos en la fila de encabezado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockLayout {
    /// Tríos desde cada 店名 más pares 品名|售量 no cubiertos
    #[default]
    Auto,
    StoreTriples,
    ProductPairs,
}

/// Configuración explícita de una ejecución. No hay estado global:
/// se construye una vez y se pasa a `generate_report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub catalog: ProductCatalog,
    pub markers: Markers,
    pub fill_strategy: FillStrategy,
    pub header_strategy: HeaderStrategy,
    pub block_layout: BlockLayout,
    /// Productos que se dejan en blanco en la fila de 粒數統計
    pub unit_summary_exclusions: Vec<String>,
    pub header_scan_lines: usize,
    pub template_header_scan_rows: u32,
    pub product_lookback_rows: u32,
    pub mojibake_fingerprints: Vec<String>,
    pub template_path: PathBuf,
    pub output_file_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            catalog: default_catalog(),
            markers: Markers::default(),
            fill_strategy: FillStrategy::default(),
            header_strategy: HeaderStrategy::default(),
            block_layout: BlockLayout::default(),
            unit_summary_exclusions: Vec::new(),
            header_scan_lines: 20,
            template_header_scan_rows: 10,
            product_lookback_rows: 5,
            // Big5 leído como Latin-1: 店 -> ©±, 品 -> «~, 售 -> °â, 名 -> ¦W
            mojibake_fingerprints: ["©±", "«~", "°â", "¦W"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            output_file_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

impl ReportConfig {
    /// Carga la configuración desde variables de entorno:
    /// - `POSREPORT_CONFIG`: JSON que sobreescribe los valores por defecto
    /// - `POSREPORT_TEMPLATE`: ruta de la plantilla
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("POSREPORT_CONFIG") {
            Ok(path) if !path.trim().is_empty() => {
                info!(path = %path, "loading report config");
                Self::load(path.trim())?
            }
            _ => ReportConfig::default(),
        };
        if let Ok(template) = std::env::var("POSREPORT_TEMPLATE") {
            if !template.trim().is_empty() {
                config.template_path = PathBuf::from(template.trim());
            }
        }
        debug!(?config, "report config resolved");
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Campos ausentes toman el valor por defecto.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Aplica un JSON parcial encima de esta configuración. Los objetos se
    /// fusionan recursivamente, así `{"catalog": {"特幼": 120}}` cambia sólo
    /// ese producto y conserva el orden del catálogo.
    pub fn merged_with_json(&self, json: &str) -> Result<Self, ConfigError> {
        let mut base = serde_json::to_value(self)?;
        let overrides: serde_json::Value = serde_json::from_str(json)?;
        merge_json(&mut base, overrides);
        Ok(serde_json::from_value(base)?)
    }

    pub fn bind_addr() -> String {
        std::env::var("POSREPORT_BIND")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
    }
}

fn merge_json(base: &mut serde_json::Value, overrides: serde_json::Value) {
    match (base, overrides) {
        (serde_json::Value::Object(b), serde_json::Value::Object(o)) => {
            for (k, v) in o {
                match b.get_mut(&k) {
                    Some(slot) => merge_json(slot, v),
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}
