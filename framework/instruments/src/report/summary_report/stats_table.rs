use tabled::Tabled;

#[derive(Tabled, Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub name: String,
    #[tabled(rename = "25%", display = "optional_ms")]
    pub q1_ms: Option<f64>,
    #[tabled(display = "optional_ms")]
    pub median: Option<f64>,
    #[tabled(rename = "75%", display = "optional_ms")]
    pub q3_ms: Option<f64>,
    #[tabled(display = "optional_ms")]
    pub average: Option<f64>,
    #[tabled(display = "optional_float2")]
    pub std: Option<f64>,
    pub finished: usize,
    pub errors: usize,
}

#[derive(Tabled, Debug, Clone, PartialEq)]
pub struct WhiskerRow {
    pub name: String,
    #[tabled(display = "ms")]
    pub min: f64,
    #[tabled(rename = "lower whisker", display = "ms")]
    pub lower_whisker: f64,
    #[tabled(rename = "25%", display = "ms")]
    pub q1: f64,
    #[tabled(display = "ms")]
    pub median: f64,
    #[tabled(rename = "75%", display = "ms")]
    pub q3: f64,
    #[tabled(rename = "upper whisker", display = "ms")]
    pub upper_whisker: f64,
    #[tabled(display = "ms")]
    pub max: f64,
}

fn ms(n: &f64) -> String {
    format!("{:.2} ms", n)
}

fn optional_ms(n: &Option<f64>) -> String {
    n.as_ref().map(ms).unwrap_or_else(|| "-".to_string())
}

fn optional_float2(n: &Option<f64>) -> String {
    n.map(|n| format!("{:.2}", n))
        .unwrap_or_else(|| "-".to_string())
}
