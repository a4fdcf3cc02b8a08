use crate::pgm::Id;
use pretty_dtoa::{dtoa, FmtFloatConfig};

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(false)
    .max_significant_digits(9);

pub fn format_f64_vec(v: &[f64]) -> String {
    let a: Vec<String> = v.iter().map(|f| dtoa(*f, FLOAT_CONFIG)).collect();
    format!("[{}]", a.join(", "))
}

/// Formats ids as ranges where they are consecutive, e.g. "[0..4, 7]".
pub fn format_ids(ids: &[Id]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut i = 0;
    while i < ids.len() {
        let mut j = i;
        while j + 1 < ids.len() && ids[j + 1] == ids[j] + 1 {
            j += 1;
        }
        if j > i {
            parts.push(format!("{}..{}", ids[i], ids[j] + 1));
        } else {
            parts.push(ids[i].to_string());
        }
        i = j + 1;
    }
    format!("[{}]", parts.join(", "))
}
