use crate::attr::AttributeResolver;
use crate::error::{ConvertError, Result};
use crate::pgm::{Branch3Side, BranchSide};

pub const TAP_SIDE: &str = "tap_side";

/// Terminal of a transformer, as named in the `tap_side` column.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Terminal {
    Hv,
    Mv,
    Lv,
}

impl Terminal {
    /// Column holding the nominal voltage of this terminal.
    pub fn voltage_column(&self) -> &'static str {
        match self {
            Terminal::Hv => "vn_hv_kv",
            Terminal::Mv => "vn_mv_kv",
            Terminal::Lv => "vn_lv_kv",
        }
    }
}

/// Reads `tap_side` and checks each value against the terminals of the
/// device. Rows without a tap changer (empty tap side) are put on the high
/// voltage side.
pub fn tap_terminals(
    attrs: &AttributeResolver,
    table: &str,
    terminals: &[Terminal],
) -> Result<Vec<Terminal>> {
    attrs
        .strings(table, TAP_SIDE, Some(""))?
        .into_iter()
        .map(|side| {
            let terminal = match side.as_str() {
                "" | "hv" => Some(Terminal::Hv),
                "mv" => Some(Terminal::Mv),
                "lv" => Some(Terminal::Lv),
                _ => None,
            };
            match terminal {
                Some(terminal) if terminals.contains(&terminal) => Ok(terminal),
                _ => Err(ConvertError::InvalidTapSide {
                    table: table.to_string(),
                    side,
                }),
            }
        })
        .collect()
}

pub fn branch_side(terminal: Terminal) -> BranchSide {
    match terminal {
        Terminal::Lv => BranchSide::ToSide,
        _ => BranchSide::FromSide,
    }
}

pub fn branch3_side(terminal: Terminal) -> Branch3Side {
    match terminal {
        Terminal::Hv => Branch3Side::Side1,
        Terminal::Mv => Branch3Side::Side2,
        Terminal::Lv => Branch3Side::Side3,
    }
}

/// Voltage (V) of one tap step: the step in percent of the nominal voltage
/// of the tap side.
pub fn tap_sizes(attrs: &AttributeResolver, table: &str, tap_sides: &[Terminal]) -> Result<Vec<f64>> {
    let tap_step_percent = attrs.floats(table, "tap_step_percent", None)?;

    let mut voltages = Vec::with_capacity(3);
    for terminal in [Terminal::Hv, Terminal::Mv, Terminal::Lv] {
        if tap_sides.contains(&terminal) {
            voltages.push((terminal, attrs.floats(table, terminal.voltage_column(), None)?));
        }
    }

    Ok(tap_sides
        .iter()
        .enumerate()
        .map(|(i, side)| {
            let vn_kv = voltages
                .iter()
                .find(|(terminal, _)| terminal == side)
                .map(|(_, vn_kv)| vn_kv[i])
                .unwrap_or(f64::NAN);
            tap_step_percent[i] * (1e-2 * 1e3) * vn_kv
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::StdTypes;
    use crate::table::{Table, TableSet};
    use anyhow::Result;
    use approx::assert_relative_eq;

    #[test]
    fn test_two_winding_tap_size() -> Result<()> {
        let data = TableSet::new().with_table(
            "trafo",
            Table::with_rows(2)
                .with_column("tap_side", vec!["hv", "lv"])
                .with_column("tap_step_percent", vec![2.5, 1.5])
                .with_column("vn_hv_kv", vec![110.0, 20.0])
                .with_column("vn_lv_kv", vec![10.0, 0.4]),
        );
        let types = StdTypes::new();
        let attrs = AttributeResolver::new(&data, &types);

        let sides = tap_terminals(&attrs, "trafo", &[Terminal::Hv, Terminal::Lv])?;
        assert_eq!(sides, vec![Terminal::Hv, Terminal::Lv]);
        assert_eq!(
            sides.iter().map(|&t| branch_side(t)).collect::<Vec<_>>(),
            vec![BranchSide::FromSide, BranchSide::ToSide]
        );

        let sizes = tap_sizes(&attrs, "trafo", &sides)?;
        assert_relative_eq!(sizes[0], 2750.0);
        assert_relative_eq!(sizes[1], 6.0);
        Ok(())
    }

    #[test]
    fn test_three_winding_tap_size() -> Result<()> {
        let data = TableSet::new().with_table(
            "trafo3w",
            Table::with_rows(3)
                .with_column("tap_side", vec!["hv", "mv", "lv"])
                .with_column("tap_step_percent", vec![1.0, 1.0, 1.0])
                .with_column("vn_hv_kv", vec![110.0, 110.0, 110.0])
                .with_column("vn_mv_kv", vec![20.0, 20.0, 20.0])
                .with_column("vn_lv_kv", vec![10.0, 10.0, 10.0]),
        );
        let types = StdTypes::new();
        let attrs = AttributeResolver::new(&data, &types);

        let sides = tap_terminals(&attrs, "trafo3w", &[Terminal::Hv, Terminal::Mv, Terminal::Lv])?;
        assert_eq!(
            sides.iter().map(|&t| branch3_side(t)).collect::<Vec<_>>(),
            vec![Branch3Side::Side1, Branch3Side::Side2, Branch3Side::Side3]
        );
        let sizes = tap_sizes(&attrs, "trafo3w", &sides)?;
        assert_relative_eq!(sizes[0], 1100.0);
        assert_relative_eq!(sizes[1], 200.0);
        assert_relative_eq!(sizes[2], 100.0);
        Ok(())
    }

    #[test]
    fn test_invalid_tap_side() {
        let data = TableSet::new().with_table(
            "trafo",
            Table::with_rows(1).with_column("tap_side", vec!["mv"]),
        );
        let types = StdTypes::new();
        let attrs = AttributeResolver::new(&data, &types);
        assert!(matches!(
            tap_terminals(&attrs, "trafo", &[Terminal::Hv, Terminal::Lv]),
            Err(ConvertError::InvalidTapSide { .. })
        ));
    }
}
