use crate::attr::{AttributeResolver, StdTypes};
use crate::debug::{format_f64_vec, format_ids};
use crate::error::{ConvertError, Result};
use crate::ids::IdRegistry;
use crate::pgm::*;
use crate::switch::{SwitchElement, SwitchStates, SWITCH};
use crate::table::TableSet;
use crate::tap::{branch3_side, branch_side, tap_sizes, tap_terminals, Terminal};
use crate::winding::WindingTypes;
use std::f64::consts::PI;

/// Name of the qualifier of each sym_load block derived from one load row,
/// in the order the blocks are laid out.
pub const LOAD_BLOCKS: [(&str, LoadGenType); 3] = [
    ("const_power", LoadGenType::ConstPower),
    ("const_impedance", LoadGenType::ConstImpedance),
    ("const_current", LoadGenType::ConstCurrent),
];

pub const BUS_TO_BUS: &str = "bus_to_bus";

/// Clock number of a phase shift in degrees.
pub fn clock(shift_degree: f64) -> i8 {
    ((shift_degree / 30.0).round_ties_even() as i64).rem_euclid(12) as i8
}

fn unpopulated<T>(family: &'static str, records: &Option<Vec<T>>) -> Result<()> {
    match records {
        Some(_) => Err(ConvertError::FamilyAlreadyPopulated(family)),
        None => Ok(()),
    }
}

fn select<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(mask)
        .filter(|(_, &m)| m)
        .map(|(v, _)| v.clone())
        .collect()
}

/// Tap positions are stored as floats in the source tables.
fn tap_positions(values: Vec<f64>) -> Vec<i64> {
    values.into_iter().map(|v| v.round() as i64).collect()
}

/// Builds the array model from the source tables, one device family at a
/// time, allocating target ids as it goes.
pub struct InputConverter<'a, 'r> {
    attrs: AttributeResolver<'a>,
    ids: &'r mut IdRegistry,
    windings: WindingTypes,
    system_frequency: f64,
    data: InputData,
}

impl<'a, 'r> InputConverter<'a, 'r> {
    pub fn new(
        tables: &'a TableSet,
        std_types: &'a StdTypes,
        ids: &'r mut IdRegistry,
        system_frequency: f64,
    ) -> Self {
        Self {
            attrs: AttributeResolver::new(tables, std_types),
            ids,
            windings: WindingTypes::new(),
            system_frequency,
            data: InputData::default(),
        }
    }

    /// Converts every device family in a fixed order.
    pub fn convert(mut self) -> Result<InputData> {
        self.create_nodes()?;
        self.create_lines()?;
        self.create_sources()?;
        self.create_sym_loads()?;
        self.create_shunts()?;
        self.create_transformers()?;
        self.create_sym_gens()?;
        self.create_three_winding_transformers()?;
        self.create_links()?;
        Ok(self.data)
    }

    fn bus_ids(&self, table: &str, column: &str) -> Result<Vec<Id>> {
        let buses = self.attrs.ints(table, column, None)?;
        self.ids.to_target("bus", &buses, None)
    }

    pub fn create_nodes(&mut self) -> Result<()> {
        unpopulated("node", &self.data.node)?;
        let attrs = &self.attrs;
        if attrs.len("bus") == 0 {
            return Ok(());
        }

        let vn_kv = attrs.floats("bus", "vn_kv", None)?;
        log::trace!("bus vn_kv: {}", format_f64_vec(&vn_kv));

        let ids = self.ids.allocate("bus", attrs.index("bus"), None)?;
        let nodes: Vec<NodeInput> = ids
            .iter()
            .zip(&vn_kv)
            .map(|(&id, vn_kv)| NodeInput {
                id,
                u_rated: vn_kv * 1e3,
            })
            .collect();

        log::info!("converted {} buses to nodes {}", nodes.len(), format_ids(&ids));
        self.data.node = Some(nodes);
        Ok(())
    }

    pub fn create_lines(&mut self) -> Result<()> {
        unpopulated("line", &self.data.line)?;
        let attrs = &self.attrs;
        if attrs.len("line") == 0 {
            return Ok(());
        }

        let switch_states = SwitchStates::new(attrs).terminal_states(
            "line",
            SwitchElement::Line,
            &["from_bus", "to_bus"],
        )?;
        let from_node = self.bus_ids("line", "from_bus")?;
        let to_node = self.bus_ids("line", "to_bus")?;
        let in_service = attrs.bools("line", "in_service", None)?;
        let r_ohm_per_km = attrs.floats("line", "r_ohm_per_km", None)?;
        let x_ohm_per_km = attrs.floats("line", "x_ohm_per_km", None)?;
        let c_nf_per_km = attrs.floats("line", "c_nf_per_km", None)?;
        let g_us_per_km = attrs.floats("line", "g_us_per_km", None)?;
        let length_km = attrs.floats("line", "length_km", None)?;
        let parallel = attrs.floats("line", "parallel", None)?;
        let max_i_ka = attrs.floats("line", "max_i_ka", None)?;
        let df = attrs.floats("line", "df", None)?;

        let ids = self.ids.allocate("line", attrs.index("line"), None)?;
        let lines: Vec<LineInput> = (0..ids.len())
            .map(|i| LineInput {
                id: ids[i],
                from_node: from_node[i],
                to_node: to_node[i],
                from_status: in_service[i] && switch_states[0][i],
                to_status: in_service[i] && switch_states[1][i],
                r1: r_ohm_per_km[i] * length_km[i] / parallel[i],
                x1: x_ohm_per_km[i] * length_km[i] / parallel[i],
                c1: c_nf_per_km[i] * length_km[i] * parallel[i] * 1e-9,
                // tan1 = R1 / Xc1 = (g * 1e-6) / (2 * pi * f * c * 1e-9)
                tan1: g_us_per_km[i]
                    / c_nf_per_km[i]
                    / (2.0 * PI * self.system_frequency * 1e-3),
                i_n: max_i_ka[i] * 1e3 * df[i] * parallel[i],
            })
            .collect();

        log::info!("converted {} lines", lines.len());
        self.data.line = Some(lines);
        Ok(())
    }

    pub fn create_sources(&mut self) -> Result<()> {
        unpopulated("source", &self.data.source)?;
        let attrs = &self.attrs;
        if attrs.len("ext_grid") == 0 {
            return Ok(());
        }

        let node = self.bus_ids("ext_grid", "bus")?;
        let status = attrs.bools("ext_grid", "in_service", Some(true))?;
        let vm_pu = attrs.floats("ext_grid", "vm_pu", None)?;
        let va_degree = attrs.floats("ext_grid", "va_degree", Some(0.0))?;
        let rx_max = attrs.floats("ext_grid", "rx_max", Some(f64::NAN))?;
        let s_sc_max_mva = attrs.floats("ext_grid", "s_sc_max_mva", Some(f64::NAN))?;

        let ids = self.ids.allocate("ext_grid", attrs.index("ext_grid"), None)?;
        let sources: Vec<SourceInput> = (0..ids.len())
            .map(|i| SourceInput {
                id: ids[i],
                node: node[i],
                status: status[i],
                u_ref: vm_pu[i],
                u_ref_angle: va_degree[i] * (PI / 180.0),
                sk: s_sc_max_mva[i] * 1e6,
                rx_ratio: rx_max[i],
            })
            .collect();

        log::info!("converted {} external grids to sources", sources.len());
        self.data.source = Some(sources);
        Ok(())
    }

    /// Each load row becomes three sym_loads (constant power, impedance and
    /// current), laid out as three consecutive blocks in `LOAD_BLOCKS` order.
    pub fn create_sym_loads(&mut self) -> Result<()> {
        unpopulated("sym_load", &self.data.sym_load)?;
        let attrs = &self.attrs;
        let n = attrs.len("load");
        if n == 0 {
            return Ok(());
        }

        let node = self.bus_ids("load", "bus")?;
        let status = attrs.bools("load", "in_service", None)?;
        let p_mw = attrs.floats("load", "p_mw", None)?;
        let q_mvar = attrs.floats("load", "q_mvar", Some(0.0))?;
        let const_i_percent = attrs.floats("load", "const_i_percent", Some(0.0))?;
        let const_z_percent = attrs.floats("load", "const_z_percent", Some(0.0))?;
        let scaling = attrs.floats("load", "scaling", Some(1.0))?;

        // W (VAr) per MW (MVAr) of each block
        let multiplier = |load_type: LoadGenType, i: usize| -> f64 {
            let percent = match load_type {
                LoadGenType::ConstPower => 100.0 - const_i_percent[i] - const_z_percent[i],
                LoadGenType::ConstImpedance => const_z_percent[i],
                LoadGenType::ConstCurrent => const_i_percent[i],
            };
            percent * 1e-2 * scaling[i] * 1e6
        };

        let mut sym_loads = Vec::with_capacity(3 * n);
        for (name, load_type) in LOAD_BLOCKS {
            let ids = self.ids.allocate("load", attrs.index("load"), Some(name))?;
            sym_loads.extend((0..n).map(|i| SymApplianceInput {
                id: ids[i],
                node: node[i],
                status: status[i],
                load_gen_type: load_type,
                p_specified: multiplier(load_type, i) * p_mw[i],
                q_specified: multiplier(load_type, i) * q_mvar[i],
            }));
        }

        log::info!("converted {} loads to {} sym_loads", n, sym_loads.len());
        self.data.sym_load = Some(sym_loads);
        Ok(())
    }

    pub fn create_shunts(&mut self) -> Result<()> {
        unpopulated("shunt", &self.data.shunt)?;
        let attrs = &self.attrs;
        if attrs.len("shunt") == 0 {
            return Ok(());
        }

        let node = self.bus_ids("shunt", "bus")?;
        let status = attrs.bools("shunt", "in_service", None)?;
        let p_mw = attrs.floats("shunt", "p_mw", None)?;
        let q_mvar = attrs.floats("shunt", "q_mvar", None)?;
        let step = attrs.floats("shunt", "step", Some(1.0))?;
        let vn_kv = attrs.floats("shunt", "vn_kv", None)?;

        let ids = self.ids.allocate("shunt", attrs.index("shunt"), None)?;
        let shunts: Vec<ShuntInput> = (0..ids.len())
            .map(|i| {
                let vn_kv_2 = vn_kv[i] * vn_kv[i];
                ShuntInput {
                    id: ids[i],
                    node: node[i],
                    status: status[i],
                    g1: p_mw[i] * step[i] / vn_kv_2,
                    b1: -(q_mvar[i] * step[i]) / vn_kv_2,
                }
            })
            .collect();

        log::info!("converted {} shunts", shunts.len());
        self.data.shunt = Some(shunts);
        Ok(())
    }

    pub fn create_transformers(&mut self) -> Result<()> {
        unpopulated("transformer", &self.data.transformer)?;
        let attrs = &self.attrs;
        if attrs.len("trafo") == 0 {
            return Ok(());
        }

        let switch_states = SwitchStates::new(attrs).terminal_states(
            "trafo",
            SwitchElement::Trafo,
            &["hv_bus", "lv_bus"],
        )?;
        let windings = self.windings.two_winding(attrs, "trafo")?;
        let tap_sides = tap_terminals(attrs, "trafo", &[Terminal::Hv, Terminal::Lv])?;
        let tap_size = tap_sizes(attrs, "trafo", &tap_sides)?;

        let from_node = self.bus_ids("trafo", "hv_bus")?;
        let to_node = self.bus_ids("trafo", "lv_bus")?;
        let in_service = attrs.bools("trafo", "in_service", None)?;
        let vn_hv_kv = attrs.floats("trafo", "vn_hv_kv", None)?;
        let vn_lv_kv = attrs.floats("trafo", "vn_lv_kv", None)?;
        let sn_mva = attrs.floats("trafo", "sn_mva", None)?;
        let parallel = attrs.floats("trafo", "parallel", Some(1.0))?;
        let vk_percent = attrs.floats("trafo", "vk_percent", None)?;
        let vkr_percent = attrs.floats("trafo", "vkr_percent", None)?;
        let i0_percent = attrs.floats("trafo", "i0_percent", None)?;
        let pfe_kw = attrs.floats("trafo", "pfe_kw", None)?;
        let shift_degree = attrs.floats("trafo", "shift_degree", Some(0.0))?;
        let tap_pos = tap_positions(attrs.floats("trafo", "tap_pos", None)?);
        let tap_min = tap_positions(attrs.floats("trafo", "tap_min", None)?);
        let tap_max = tap_positions(attrs.floats("trafo", "tap_max", None)?);
        let tap_nom = tap_positions(attrs.floats("trafo", "tap_neutral", None)?);

        let ids = self.ids.allocate("trafo", attrs.index("trafo"), None)?;
        let transformers: Vec<TransformerInput> = (0..ids.len())
            .map(|i| TransformerInput {
                id: ids[i],
                from_node: from_node[i],
                to_node: to_node[i],
                from_status: in_service[i] && switch_states[0][i],
                to_status: in_service[i] && switch_states[1][i],
                u1: vn_hv_kv[i] * 1e3,
                u2: vn_lv_kv[i] * 1e3,
                sn: sn_mva[i] * parallel[i] * 1e6,
                uk: vk_percent[i] * 1e-2,
                pk: vkr_percent[i] * sn_mva[i] * parallel[i] * (1e6 * 1e-2),
                i0: i0_percent[i] * 1e-2,
                p0: pfe_kw[i] * parallel[i] * 1e3,
                winding_from: windings[i][0],
                winding_to: windings[i][1],
                clock: clock(shift_degree[i]),
                tap_side: branch_side(tap_sides[i]),
                tap_pos: tap_pos[i],
                tap_min: tap_min[i],
                tap_max: tap_max[i],
                tap_nom: tap_nom[i],
                tap_size: tap_size[i],
            })
            .collect();

        log::info!("converted {} transformers", transformers.len());
        self.data.transformer = Some(transformers);
        Ok(())
    }

    pub fn create_sym_gens(&mut self) -> Result<()> {
        unpopulated("sym_gen", &self.data.sym_gen)?;
        let attrs = &self.attrs;
        if attrs.len("sgen") == 0 {
            return Ok(());
        }

        let node = self.bus_ids("sgen", "bus")?;
        let status = attrs.bools("sgen", "in_service", None)?;
        let p_mw = attrs.floats("sgen", "p_mw", None)?;
        let q_mvar = attrs.floats("sgen", "q_mvar", Some(0.0))?;
        let scaling = attrs.floats("sgen", "scaling", Some(1.0))?;

        let ids = self.ids.allocate("sgen", attrs.index("sgen"), None)?;
        let sym_gens: Vec<SymApplianceInput> = (0..ids.len())
            .map(|i| SymApplianceInput {
                id: ids[i],
                node: node[i],
                status: status[i],
                load_gen_type: LoadGenType::ConstPower,
                p_specified: p_mw[i] * 1e6 * scaling[i],
                q_specified: q_mvar[i] * 1e6 * scaling[i],
            })
            .collect();

        log::info!("converted {} static generators to sym_gens", sym_gens.len());
        self.data.sym_gen = Some(sym_gens);
        Ok(())
    }

    pub fn create_three_winding_transformers(&mut self) -> Result<()> {
        unpopulated(
            "three_winding_transformer",
            &self.data.three_winding_transformer,
        )?;
        let attrs = &self.attrs;
        if attrs.len("trafo3w") == 0 {
            return Ok(());
        }

        let switch_states = SwitchStates::new(attrs).terminal_states(
            "trafo3w",
            SwitchElement::Trafo3w,
            &["hv_bus", "mv_bus", "lv_bus"],
        )?;
        let windings = self.windings.three_winding(attrs, "trafo3w")?;
        let tap_sides = tap_terminals(
            attrs,
            "trafo3w",
            &[Terminal::Hv, Terminal::Mv, Terminal::Lv],
        )?;
        let tap_size = tap_sizes(attrs, "trafo3w", &tap_sides)?;

        let node_1 = self.bus_ids("trafo3w", "hv_bus")?;
        let node_2 = self.bus_ids("trafo3w", "mv_bus")?;
        let node_3 = self.bus_ids("trafo3w", "lv_bus")?;
        let in_service = attrs.bools("trafo3w", "in_service", None)?;
        let vn_hv_kv = attrs.floats("trafo3w", "vn_hv_kv", None)?;
        let vn_mv_kv = attrs.floats("trafo3w", "vn_mv_kv", None)?;
        let vn_lv_kv = attrs.floats("trafo3w", "vn_lv_kv", None)?;
        let sn_hv_mva = attrs.floats("trafo3w", "sn_hv_mva", None)?;
        let sn_mv_mva = attrs.floats("trafo3w", "sn_mv_mva", None)?;
        let sn_lv_mva = attrs.floats("trafo3w", "sn_lv_mva", None)?;
        let vk_hv_percent = attrs.floats("trafo3w", "vk_hv_percent", None)?;
        let vk_mv_percent = attrs.floats("trafo3w", "vk_mv_percent", None)?;
        let vk_lv_percent = attrs.floats("trafo3w", "vk_lv_percent", None)?;
        let vkr_hv_percent = attrs.floats("trafo3w", "vkr_hv_percent", None)?;
        let vkr_mv_percent = attrs.floats("trafo3w", "vkr_mv_percent", None)?;
        let vkr_lv_percent = attrs.floats("trafo3w", "vkr_lv_percent", None)?;
        let i0_percent = attrs.floats("trafo3w", "i0_percent", None)?;
        let pfe_kw = attrs.floats("trafo3w", "pfe_kw", None)?;
        let shift_mv_degree = attrs.floats("trafo3w", "shift_mv_degree", Some(0.0))?;
        let shift_lv_degree = attrs.floats("trafo3w", "shift_lv_degree", Some(0.0))?;
        let tap_pos = tap_positions(attrs.floats("trafo3w", "tap_pos", None)?);
        let tap_min = tap_positions(attrs.floats("trafo3w", "tap_min", None)?);
        let tap_max = tap_positions(attrs.floats("trafo3w", "tap_max", None)?);
        let tap_nom = tap_positions(attrs.floats("trafo3w", "tap_neutral", None)?);

        let ids = self.ids.allocate("trafo3w", attrs.index("trafo3w"), None)?;
        let transformers: Vec<ThreeWindingTransformerInput> = (0..ids.len())
            .map(|i| ThreeWindingTransformerInput {
                id: ids[i],
                node_1: node_1[i],
                node_2: node_2[i],
                node_3: node_3[i],
                status_1: in_service[i] && switch_states[0][i],
                status_2: in_service[i] && switch_states[1][i],
                status_3: in_service[i] && switch_states[2][i],
                u1: vn_hv_kv[i] * 1e3,
                u2: vn_mv_kv[i] * 1e3,
                u3: vn_lv_kv[i] * 1e3,
                sn_1: sn_hv_mva[i] * 1e6,
                sn_2: sn_mv_mva[i] * 1e6,
                sn_3: sn_lv_mva[i] * 1e6,
                uk_12: vk_hv_percent[i] * 1e-2,
                uk_13: vk_lv_percent[i] * 1e-2,
                uk_23: vk_mv_percent[i] * 1e-2,
                // losses per winding pair refer to the smaller rated power
                pk_12: vkr_hv_percent[i] * sn_hv_mva[i].min(sn_mv_mva[i]) * (1e-2 * 1e6),
                pk_13: vkr_lv_percent[i] * sn_hv_mva[i].min(sn_lv_mva[i]) * (1e-2 * 1e6),
                pk_23: vkr_mv_percent[i] * sn_mv_mva[i].min(sn_lv_mva[i]) * (1e-2 * 1e6),
                i0: i0_percent[i] * 1e-2,
                p0: pfe_kw[i] * 1e3,
                winding_1: windings[i][0],
                winding_2: windings[i][1],
                winding_3: windings[i][2],
                clock_12: clock(shift_mv_degree[i]),
                clock_13: clock(shift_lv_degree[i]),
                tap_side: branch3_side(tap_sides[i]),
                tap_pos: tap_pos[i],
                tap_min: tap_min[i],
                tap_max: tap_max[i],
                tap_nom: tap_nom[i],
                tap_size: tap_size[i],
            })
            .collect();

        log::info!("converted {} three winding transformers", transformers.len());
        self.data.three_winding_transformer = Some(transformers);
        Ok(())
    }

    /// Switches between two buses become links; the switch state applies to
    /// both ends.
    pub fn create_links(&mut self) -> Result<()> {
        unpopulated("link", &self.data.link)?;
        let attrs = &self.attrs;
        if attrs.len(SWITCH) == 0 {
            return Ok(());
        }

        let et = attrs.strings(SWITCH, "et", None)?;
        let bus_to_bus: Vec<bool> = et
            .iter()
            .map(|et| et == SwitchElement::Bus.code())
            .collect();
        if !bus_to_bus.contains(&true) {
            return Ok(());
        }

        let index = select(attrs.index(SWITCH), &bus_to_bus);
        let from_bus = select(&attrs.ints(SWITCH, "bus", None)?, &bus_to_bus);
        let to_bus = select(&attrs.ints(SWITCH, "element", None)?, &bus_to_bus);
        let closed = select(&attrs.bools(SWITCH, "closed", Some(true))?, &bus_to_bus);
        let from_node = self.ids.to_target("bus", &from_bus, None)?;
        let to_node = self.ids.to_target("bus", &to_bus, None)?;

        let ids = self.ids.allocate(SWITCH, &index, Some(BUS_TO_BUS))?;
        let links: Vec<LinkInput> = (0..ids.len())
            .map(|i| LinkInput {
                id: ids[i],
                from_node: from_node[i],
                to_node: to_node[i],
                from_status: closed[i],
                to_status: closed[i],
            })
            .collect();

        log::info!("converted {} bus to bus switches to links", links.len());
        self.data.link = Some(links);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use anyhow::Result;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn buses(n: usize) -> Table {
        Table::with_rows(n).with_column("vn_kv", vec![20.0; n])
    }

    fn convert(tables: &TableSet) -> Result<(InputData, IdRegistry)> {
        let std_types = StdTypes::new();
        let mut ids = IdRegistry::new();
        let data = InputConverter::new(tables, &std_types, &mut ids, 50.0).convert()?;
        Ok((data, ids))
    }

    #[test]
    fn test_clock() {
        assert_eq!(clock(330.0), 11);
        assert_eq!(clock(0.0), 0);
        assert_eq!(clock(150.0), 5);
        assert_eq!(clock(360.0), 0);
        assert_eq!(clock(-30.0), 11);
    }

    #[test]
    fn test_nodes() -> Result<()> {
        let tables = TableSet::new().with_table(
            "bus",
            Table::new(vec![101, 102]).with_column("vn_kv", vec![110.0, 0.4]),
        );
        let (data, ids) = convert(&tables)?;

        let nodes = data.node.unwrap();
        assert_eq!(nodes[0], NodeInput { id: 0, u_rated: 110e3 });
        assert_eq!(nodes[1].id, 1);
        assert_relative_eq!(nodes[1].u_rated, 400.0);
        assert_eq!(ids.to_source("bus", &[0, 1], None)?, vec![101, 102]);
        assert!(data.line.is_none());
        Ok(())
    }

    #[test]
    fn test_lines() -> Result<()> {
        let tables = TableSet::new()
            .with_table("bus", buses(3))
            .with_table(
                "line",
                Table::new(vec![5, 6])
                    .with_column("from_bus", vec![0i64, 1])
                    .with_column("to_bus", vec![1i64, 2])
                    .with_column("in_service", vec![true, false])
                    .with_column("r_ohm_per_km", vec![0.2, 0.2])
                    .with_column("x_ohm_per_km", vec![0.1, 0.1])
                    .with_column("c_nf_per_km", vec![10.0, 10.0])
                    .with_column("g_us_per_km", vec![2.0, 0.0])
                    .with_column("length_km", vec![2.0, 1.0])
                    .with_column("parallel", vec![2.0, 1.0])
                    .with_column("max_i_ka", vec![0.4, 0.4])
                    .with_column("df", vec![0.5, 1.0]),
            )
            .with_table(
                "switch",
                Table::with_rows(1)
                    .with_column("et", vec!["l"])
                    .with_column("bus", vec![1i64])
                    .with_column("element", vec![5i64])
                    .with_column("closed", vec![false]),
            );
        let (data, _) = convert(&tables)?;
        let lines = data.line.unwrap();

        assert_eq!((lines[0].id, lines[1].id), (3, 4));
        assert_eq!((lines[0].from_node, lines[0].to_node), (0, 1));
        assert!(lines[0].from_status);
        assert!(!lines[0].to_status);
        assert!(!lines[1].from_status && !lines[1].to_status);

        assert_relative_eq!(lines[0].r1, 0.2);
        assert_relative_eq!(lines[0].x1, 0.1);
        assert_relative_eq!(lines[0].c1, 40e-9);
        assert_relative_eq!(lines[0].tan1, 2.0 / 10.0 / (2.0 * PI * 50.0 * 1e-3));
        assert_relative_eq!(lines[0].i_n, 400.0);
        assert_abs_diff_eq!(lines[1].tan1, 0.0);
        Ok(())
    }

    #[test]
    fn test_sources() -> Result<()> {
        let tables = TableSet::new().with_table("bus", buses(1)).with_table(
            "ext_grid",
            Table::with_rows(1)
                .with_column("bus", vec![0i64])
                .with_column("vm_pu", vec![1.02])
                .with_column("va_degree", vec![30.0])
                .with_column("rx_max", vec![0.1])
                .with_column("s_sc_max_mva", vec![1000.0]),
        );
        let (data, _) = convert(&tables)?;
        let source = &data.source.unwrap()[0];

        assert_eq!((source.id, source.node), (1, 0));
        assert!(source.status);
        assert_relative_eq!(source.u_ref, 1.02);
        assert_relative_eq!(source.u_ref_angle, PI / 6.0);
        assert_relative_eq!(source.sk, 1e9);
        assert_relative_eq!(source.rx_ratio, 0.1);
        Ok(())
    }

    #[test]
    fn test_sym_load_split() -> Result<()> {
        let tables = TableSet::new().with_table("bus", buses(2)).with_table(
            "load",
            Table::new(vec![10, 11])
                .with_column("bus", vec![0i64, 1])
                .with_column("in_service", vec![true, true])
                .with_column("p_mw", vec![1.0, 2.0])
                .with_column("q_mvar", vec![0.5, -1.0])
                .with_column("const_i_percent", vec![20.0, 0.0])
                .with_column("const_z_percent", vec![30.0, 100.0])
                .with_column("scaling", vec![0.5, 2.0]),
        );
        let (data, ids) = convert(&tables)?;
        let sym_loads = data.sym_load.unwrap();
        assert_eq!(sym_loads.len(), 6);

        // blocks: const_power, const_impedance, const_current
        let types: Vec<LoadGenType> = sym_loads.iter().map(|l| l.load_gen_type).collect();
        assert_eq!(
            types,
            vec![
                LoadGenType::ConstPower,
                LoadGenType::ConstPower,
                LoadGenType::ConstImpedance,
                LoadGenType::ConstImpedance,
                LoadGenType::ConstCurrent,
                LoadGenType::ConstCurrent,
            ]
        );
        assert_eq!(ids.to_target("load", &[11], Some("const_current"))?, vec![7]);

        let p_mw = [1.0, 2.0];
        let q_mvar = [0.5, -1.0];
        let scaling = [0.5, 2.0];
        for i in 0..2 {
            let p: f64 = (0..3).map(|k| sym_loads[k * 2 + i].p_specified).sum();
            let q: f64 = (0..3).map(|k| sym_loads[k * 2 + i].q_specified).sum();
            assert_relative_eq!(p, p_mw[i] * scaling[i] * 1e6, max_relative = 1e-12);
            assert_relative_eq!(q, q_mvar[i] * scaling[i] * 1e6, max_relative = 1e-12);
        }
        assert_relative_eq!(sym_loads[0].p_specified, 0.5 * 0.5 * 1e6);
        assert_relative_eq!(sym_loads[2].p_specified, 0.3 * 0.5 * 1e6);
        assert_relative_eq!(sym_loads[4].p_specified, 0.2 * 0.5 * 1e6);
        assert_abs_diff_eq!(sym_loads[1].p_specified, 0.0);
        Ok(())
    }

    #[test]
    fn test_shunts_and_sym_gens() -> Result<()> {
        let tables = TableSet::new()
            .with_table("bus", buses(1))
            .with_table(
                "shunt",
                Table::with_rows(1)
                    .with_column("bus", vec![0i64])
                    .with_column("in_service", vec![true])
                    .with_column("p_mw", vec![0.1])
                    .with_column("q_mvar", vec![0.4])
                    .with_column("step", vec![2i64])
                    .with_column("vn_kv", vec![20.0]),
            )
            .with_table(
                "sgen",
                Table::with_rows(1)
                    .with_column("bus", vec![0i64])
                    .with_column("in_service", vec![true])
                    .with_column("p_mw", vec![3.0])
                    .with_column("q_mvar", vec![1.0])
                    .with_column("scaling", vec![0.5]),
            );
        let (data, _) = convert(&tables)?;

        let shunt = &data.shunt.unwrap()[0];
        assert_relative_eq!(shunt.g1, 0.2 / 400.0);
        assert_relative_eq!(shunt.b1, -0.8 / 400.0);

        let sym_gen = &data.sym_gen.unwrap()[0];
        assert_eq!(sym_gen.id, 2);
        assert_eq!(sym_gen.load_gen_type, LoadGenType::ConstPower);
        assert_relative_eq!(sym_gen.p_specified, 1.5e6);
        assert_relative_eq!(sym_gen.q_specified, 0.5e6);
        Ok(())
    }

    #[test]
    fn test_transformers() -> Result<()> {
        let tables = TableSet::new()
            .with_table("bus", buses(2))
            .with_table(
                "trafo",
                Table::with_rows(1)
                    .with_column("hv_bus", vec![0i64])
                    .with_column("lv_bus", vec![1i64])
                    .with_column("in_service", vec![true])
                    .with_column("vn_hv_kv", vec![110.0])
                    .with_column("vn_lv_kv", vec![20.0])
                    .with_column("sn_mva", vec![40.0])
                    .with_column("parallel", vec![2i64])
                    .with_column("vk_percent", vec![12.0])
                    .with_column("vkr_percent", vec![0.5])
                    .with_column("i0_percent", vec![0.1])
                    .with_column("pfe_kw", vec![30.0])
                    .with_column("vector_group", vec!["YNd5"])
                    .with_column("shift_degree", vec![150.0])
                    .with_column("tap_side", vec!["hv"])
                    .with_column("tap_pos", vec![1.0])
                    .with_column("tap_min", vec![-9.0])
                    .with_column("tap_max", vec![9.0])
                    .with_column("tap_neutral", vec![0.0])
                    .with_column("tap_step_percent", vec![1.5]),
            )
            .with_table(
                "switch",
                Table::with_rows(1)
                    .with_column("et", vec!["t"])
                    .with_column("bus", vec![1i64])
                    .with_column("element", vec![0i64])
                    .with_column("closed", vec![false]),
            );
        let (data, _) = convert(&tables)?;
        let trafo = &data.transformer.unwrap()[0];

        assert_eq!((trafo.from_node, trafo.to_node), (0, 1));
        assert!(trafo.from_status && !trafo.to_status);
        assert_relative_eq!(trafo.u1, 110e3);
        assert_relative_eq!(trafo.u2, 20e3);
        assert_relative_eq!(trafo.sn, 80e6);
        assert_relative_eq!(trafo.uk, 0.12);
        assert_relative_eq!(trafo.pk, 0.5 * 40.0 * 2.0 * 1e4);
        assert_relative_eq!(trafo.i0, 0.001);
        assert_relative_eq!(trafo.p0, 60e3);
        assert_eq!(trafo.winding_from, WindingType::WyeN);
        assert_eq!(trafo.winding_to, WindingType::Delta);
        assert_eq!(trafo.clock, 5);
        assert_eq!(trafo.tap_side, BranchSide::FromSide);
        assert_eq!(
            (trafo.tap_pos, trafo.tap_min, trafo.tap_max, trafo.tap_nom),
            (1, -9, 9, 0)
        );
        assert_relative_eq!(trafo.tap_size, 1650.0);
        Ok(())
    }

    #[test]
    fn test_transformers_without_tap_changer() -> Result<()> {
        let trafo: Table = serde_json::from_str(
            r#"{
                "index": [0, 1],
                "columns": {
                    "hv_bus": [0, 0],
                    "lv_bus": [1, 1],
                    "in_service": [true, false],
                    "vn_hv_kv": [110.0, 110.0],
                    "vn_lv_kv": [20.0, 20.0],
                    "sn_mva": [40.0, 40.0],
                    "vk_percent": [12.0, 12.0],
                    "vkr_percent": [0.5, 0.5],
                    "i0_percent": [0.1, 0.1],
                    "pfe_kw": [30.0, 30.0],
                    "vector_group": ["Dyn5", "Dyn5"],
                    "tap_side": [null, null],
                    "tap_pos": [null, null],
                    "tap_min": [null, null],
                    "tap_max": [null, null],
                    "tap_neutral": [null, null],
                    "tap_step_percent": [null, null]
                }
            }"#,
        )?;
        let tables = TableSet::new()
            .with_table("bus", buses(2))
            .with_table("trafo", trafo);
        let (data, _) = convert(&tables)?;
        let trafos = data.transformer.unwrap();

        assert_eq!(trafos.len(), 2);
        assert_eq!(trafos[0].tap_side, BranchSide::FromSide);
        assert_eq!(trafos[1].tap_side, BranchSide::FromSide);
        assert_eq!((trafos[0].tap_pos, trafos[0].tap_nom), (0, 0));
        assert!(trafos[0].tap_size.is_nan());
        assert!(trafos[0].from_status);
        assert!(!trafos[1].from_status);
        Ok(())
    }

    #[test]
    fn test_three_winding_transformers() -> Result<()> {
        let tables = TableSet::new().with_table("bus", buses(3)).with_table(
            "trafo3w",
            Table::with_rows(1)
                .with_column("hv_bus", vec![0i64])
                .with_column("mv_bus", vec![1i64])
                .with_column("lv_bus", vec![2i64])
                .with_column("in_service", vec![true])
                .with_column("vn_hv_kv", vec![110.0])
                .with_column("vn_mv_kv", vec![20.0])
                .with_column("vn_lv_kv", vec![10.0])
                .with_column("sn_hv_mva", vec![60.0])
                .with_column("sn_mv_mva", vec![40.0])
                .with_column("sn_lv_mva", vec![20.0])
                .with_column("vk_hv_percent", vec![10.0])
                .with_column("vk_mv_percent", vec![11.0])
                .with_column("vk_lv_percent", vec![12.0])
                .with_column("vkr_hv_percent", vec![0.3])
                .with_column("vkr_mv_percent", vec![0.4])
                .with_column("vkr_lv_percent", vec![0.5])
                .with_column("i0_percent", vec![0.1])
                .with_column("pfe_kw", vec![20.0])
                .with_column("vector_group", vec!["YNyn0d5"])
                .with_column("shift_mv_degree", vec![0.0])
                .with_column("shift_lv_degree", vec![150.0])
                .with_column("tap_side", vec!["mv"])
                .with_column("tap_pos", vec![0.0])
                .with_column("tap_min", vec![-5.0])
                .with_column("tap_max", vec![5.0])
                .with_column("tap_neutral", vec![0.0])
                .with_column("tap_step_percent", vec![2.0]),
        );
        let (data, _) = convert(&tables)?;
        let t3 = &data.three_winding_transformer.unwrap()[0];

        assert_eq!(t3.id, 3);
        assert_eq!([t3.node_1, t3.node_2, t3.node_3], [0, 1, 2]);
        assert!(t3.status_1 && t3.status_2 && t3.status_3);
        assert_relative_eq!(t3.uk_12, 0.10);
        assert_relative_eq!(t3.uk_13, 0.12);
        assert_relative_eq!(t3.uk_23, 0.11);
        assert_relative_eq!(t3.pk_12, 0.3 * 40.0 * 1e4);
        assert_relative_eq!(t3.pk_13, 0.5 * 20.0 * 1e4);
        assert_relative_eq!(t3.pk_23, 0.4 * 20.0 * 1e4);
        assert_eq!(
            [t3.winding_1, t3.winding_2, t3.winding_3],
            [WindingType::WyeN, WindingType::WyeN, WindingType::Delta]
        );
        assert_eq!((t3.clock_12, t3.clock_13), (0, 5));
        assert_eq!(t3.tap_side, Branch3Side::Side2);
        assert_relative_eq!(t3.tap_size, 400.0);
        Ok(())
    }

    #[test]
    fn test_links() -> Result<()> {
        let tables = TableSet::new().with_table("bus", buses(3)).with_table(
            "switch",
            Table::new(vec![0, 1, 2])
                .with_column("et", vec!["b", "l", "b"])
                .with_column("bus", vec![0i64, 0, 1])
                .with_column("element", vec![1i64, 0, 2])
                .with_column("closed", vec![true, false, false]),
        );
        let (data, ids) = convert(&tables)?;
        let links = data.link.unwrap();

        assert_eq!(
            links,
            vec![
                LinkInput {
                    id: 3,
                    from_node: 0,
                    to_node: 1,
                    from_status: true,
                    to_status: true,
                },
                LinkInput {
                    id: 4,
                    from_node: 1,
                    to_node: 2,
                    from_status: false,
                    to_status: false,
                },
            ]
        );
        assert_eq!(ids.to_source("switch", &[3, 4], Some(BUS_TO_BUS))?, vec![0, 2]);
        Ok(())
    }

    #[test]
    fn test_already_populated() -> Result<()> {
        let tables = TableSet::new().with_table("bus", buses(1));
        let std_types = StdTypes::new();
        let mut ids = IdRegistry::new();
        let mut converter = InputConverter::new(&tables, &std_types, &mut ids, 50.0);
        converter.create_nodes()?;
        assert!(matches!(
            converter.create_nodes(),
            Err(ConvertError::FamilyAlreadyPopulated("node"))
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_bus() {
        let tables = TableSet::new().with_table("bus", buses(1)).with_table(
            "sgen",
            Table::with_rows(1)
                .with_column("bus", vec![4i64])
                .with_column("in_service", vec![true])
                .with_column("p_mw", vec![1.0]),
        );
        assert!(convert(&tables).is_err());
    }
}
