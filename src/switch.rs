use crate::attr::AttributeResolver;
use crate::error::Result;
use std::collections::HashMap;

pub const SWITCH: &str = "switch";

/// Kind of element a switch row is attached to (the `et` column).
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SwitchElement {
    /// Switch between a bus and a line terminal.
    Line,
    /// Switch between a bus and a transformer terminal.
    Trafo,
    /// Switch between a bus and a three winding transformer terminal.
    Trafo3w,
    /// Switch directly connecting two buses.
    Bus,
}

impl SwitchElement {
    pub fn code(&self) -> &'static str {
        match self {
            SwitchElement::Line => "l",
            SwitchElement::Trafo => "t",
            SwitchElement::Trafo3w => "t3",
            SwitchElement::Bus => "b",
        }
    }
}

/// Works out whether each terminal of a branch is connected, by joining the
/// branch terminals against the switch table on (element, bus).
pub struct SwitchStates<'a, 'b> {
    attrs: &'b AttributeResolver<'a>,
}

impl<'a, 'b> SwitchStates<'a, 'b> {
    pub fn new(attrs: &'b AttributeResolver<'a>) -> Self {
        Self { attrs }
    }

    /// Closed state of every switch of `kind`, keyed by (element, bus).
    ///
    /// When several switches sit on the same terminal the terminal is only
    /// closed if all of them are.
    fn closed_by_terminal(&self, kind: SwitchElement) -> Result<HashMap<(i64, i64), bool>> {
        let mut closed_by_terminal = HashMap::new();
        if self.attrs.len(SWITCH) == 0 {
            return Ok(closed_by_terminal);
        }

        let et = self.attrs.strings(SWITCH, "et", None)?;
        let bus = self.attrs.ints(SWITCH, "bus", None)?;
        let element = self.attrs.ints(SWITCH, "element", None)?;
        let closed = self.attrs.bools(SWITCH, "closed", Some(true))?;

        for i in 0..et.len() {
            if et[i] != kind.code() {
                continue;
            }
            closed_by_terminal
                .entry((element[i], bus[i]))
                .and_modify(|c| *c &= closed[i])
                .or_insert(closed[i]);
        }
        Ok(closed_by_terminal)
    }

    /// One series per terminal bus column, aligned with the rows of `table`.
    /// Terminals without a switch are closed.
    pub fn terminal_states(
        &self,
        table: &str,
        kind: SwitchElement,
        bus_columns: &[&str],
    ) -> Result<Vec<Vec<bool>>> {
        let closed_by_terminal = self.closed_by_terminal(kind)?;
        let index = self.attrs.index(table);

        bus_columns
            .iter()
            .map(|column| {
                let buses = self.attrs.ints(table, column, None)?;
                Ok(index
                    .iter()
                    .zip(&buses)
                    .map(|(&element, &bus)| {
                        closed_by_terminal
                            .get(&(element, bus))
                            .copied()
                            .unwrap_or(true)
                    })
                    .collect())
            })
            .collect()
    }
}
