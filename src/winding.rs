use crate::attr::AttributeResolver;
use crate::error::{ConvertError, Result};
use crate::pgm::WindingType;
use regex::Regex;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

/// Connection of a two winding transformer, e.g. "Dyn11".
static CONNECTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Y|YN|D|Z|ZN)(y|yn|d|z|zn)\d*$").unwrap());

/// Connection of a three winding transformer, e.g. "YNyn0d5".
static CONNECTION_PATTERN_3W: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(Y|YN|D|Z|ZN)(y|yn|d|z|zn)\d*(y|yn|d|z|zn)\d*$").unwrap()
});

pub const VECTOR_GROUP: &str = "vector_group";

impl FromStr for WindingType {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "Y" => Ok(WindingType::Wye),
            "YN" => Ok(WindingType::WyeN),
            "D" => Ok(WindingType::Delta),
            "Z" => Ok(WindingType::Zigzag),
            "ZN" => Ok(WindingType::ZigzagN),
            _ => Err(ConvertError::InvalidVectorGroup(s.to_string())),
        }
    }
}

fn parse<const N: usize>(pattern: &Regex, vector_group: &str) -> Result<[WindingType; N]> {
    let invalid = || ConvertError::InvalidVectorGroup(vector_group.to_string());
    let captures = pattern.captures(vector_group).ok_or_else(invalid)?;

    let mut windings = [WindingType::Wye; N];
    for (i, winding) in windings.iter_mut().enumerate() {
        *winding = captures.get(i + 1).ok_or_else(invalid)?.as_str().parse()?;
    }
    Ok(windings)
}

/// Windings (high voltage, low voltage) of a two winding vector group.
pub fn parse_vector_group(vector_group: &str) -> Result<[WindingType; 2]> {
    parse(&CONNECTION_PATTERN, vector_group)
}

/// Windings (high, medium, low voltage) of a three winding vector group.
pub fn parse_vector_group_3w(vector_group: &str) -> Result<[WindingType; 3]> {
    parse(&CONNECTION_PATTERN_3W, vector_group)
}

/// Resolves transformer winding types per row. Each distinct vector group
/// is parsed once per resolver.
#[derive(Default)]
pub struct WindingTypes {
    two: HashMap<String, [WindingType; 2]>,
    three: HashMap<String, [WindingType; 3]>,
}

fn resolve<const N: usize>(
    cache: &mut HashMap<String, [WindingType; N]>,
    vector_groups: Vec<String>,
    parse: fn(&str) -> Result<[WindingType; N]>,
) -> Result<Vec<[WindingType; N]>> {
    vector_groups
        .into_iter()
        .map(|vector_group| {
            if let Some(windings) = cache.get(&vector_group) {
                return Ok(*windings);
            }
            let windings = parse(&vector_group)?;
            log::debug!("vector group {}: {:?}", vector_group, windings);
            cache.insert(vector_group, windings);
            Ok(windings)
        })
        .collect()
}

impl WindingTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vector groups come from the `vector_group` column, or from the type
    /// library when the table names a `std_type` instead.
    pub fn two_winding(
        &mut self,
        attrs: &AttributeResolver,
        table: &str,
    ) -> Result<Vec<[WindingType; 2]>> {
        let vector_groups = attrs.strings(table, VECTOR_GROUP, None)?;
        resolve(&mut self.two, vector_groups, parse_vector_group)
    }

    pub fn three_winding(
        &mut self,
        attrs: &AttributeResolver,
        table: &str,
    ) -> Result<Vec<[WindingType; 3]>> {
        let vector_groups = attrs.strings(table, VECTOR_GROUP, None)?;
        resolve(&mut self.three, vector_groups, parse_vector_group_3w)
    }
}
