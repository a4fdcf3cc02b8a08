use crate::error::{ConvertError, Result};
use crate::ids::IdRegistry;
use crate::pgm::*;
use crate::table::{Table, TableSet};
use std::collections::HashMap;

/// Pairs each result record with the input record of the same id.
fn join<'b, T: Component, R: Component>(
    family: &'static str,
    input: &'b Option<Vec<T>>,
    results: &'b [R],
) -> Result<Vec<(&'b T, &'b R)>> {
    let input = input
        .as_ref()
        .ok_or(ConvertError::MissingPrerequisiteDataset(family))?;
    let by_id: HashMap<Id, &T> = input.iter().map(|r| (r.id(), r)).collect();

    results
        .iter()
        .map(|result| {
            by_id
                .get(&result.id())
                .map(|&record| (record, result))
                .ok_or(ConvertError::UnknownId(result.id()))
        })
        .collect()
}

fn ids<R: Component>(results: &[R]) -> Vec<Id> {
    results.iter().map(Component::id).collect()
}

/// Voltage magnitude (p.u.) and angle (degrees) per node.
struct NodeVoltages {
    by_id: Option<HashMap<Id, (f64, f64)>>,
}

impl NodeVoltages {
    fn new(nodes: &Option<Vec<NodeOutput>>) -> Self {
        let by_id = nodes.as_ref().map(|nodes| {
            nodes
                .iter()
                .map(|n| (n.id, (n.u_pu, n.u_angle.to_degrees())))
                .collect()
        });
        Self { by_id }
    }

    fn get(&self, node: Id) -> Result<(f64, f64)> {
        let by_id = self
            .by_id
            .as_ref()
            .ok_or(ConvertError::MissingPrerequisiteDataset("node"))?;
        by_id.get(&node).copied().ok_or(ConvertError::UnknownId(node))
    }
}

/// NodePowerAccumulator sums the power flowing into branches and
/// three-terminal branches at each of their terminal nodes.
///
/// Sums are kept in W and VAr; conversion to MW and MVAr happens once when
/// the totals are read.
#[derive(Debug, Default)]
pub struct NodePowerAccumulator {
    totals: HashMap<Id, (f64, f64)>,
}

impl NodePowerAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: Id, p: f64, q: f64) {
        let total = self.totals.entry(node).or_insert((0.0, 0.0));
        total.0 += p;
        total.1 += q;
    }

    pub fn add_branches<B: Branch>(
        &mut self,
        family: &'static str,
        input: &Option<Vec<B>>,
        results: &Option<Vec<BranchOutput>>,
    ) -> Result<()> {
        let results = match results {
            Some(results) if !results.is_empty() => results,
            _ => return Ok(()),
        };
        for (branch, result) in join(family, input, results)? {
            self.add(branch.from_node(), result.p_from, result.q_from);
            self.add(branch.to_node(), result.p_to, result.q_to);
        }
        log::debug!("accumulated node power of {} {}s", results.len(), family);
        Ok(())
    }

    pub fn add_branch3s<B: Branch3>(
        &mut self,
        family: &'static str,
        input: &Option<Vec<B>>,
        results: &Option<Vec<Branch3Output>>,
    ) -> Result<()> {
        let results = match results {
            Some(results) if !results.is_empty() => results,
            _ => return Ok(()),
        };
        for (branch, result) in join(family, input, results)? {
            let [node_1, node_2, node_3] = branch.nodes();
            self.add(node_1, result.p_1, result.q_1);
            self.add(node_2, result.p_2, result.q_2);
            self.add(node_3, result.p_3, result.q_3);
        }
        log::debug!("accumulated node power of {} {}s", results.len(), family);
        Ok(())
    }

    /// Total (MW, MVAr) at `node`; zero for nodes without contributions.
    pub fn total(&self, node: Id) -> (f64, f64) {
        let (p, q) = self.totals.get(&node).copied().unwrap_or((0.0, 0.0));
        (p * 1e-6, q * 1e-6)
    }
}

/// Rebuilds result tables keyed by source index from the result set of the
/// calculation core.
pub struct OutputConverter<'a> {
    ids: &'a IdRegistry,
    input: &'a InputData,
    output: &'a OutputData,
    voltages: NodeVoltages,
    tables: TableSet,
}

impl<'a> OutputConverter<'a> {
    pub fn new(ids: &'a IdRegistry, input: &'a InputData, output: &'a OutputData) -> Self {
        Self {
            ids,
            input,
            output,
            voltages: NodeVoltages::new(&output.node),
            tables: TableSet::new(),
        }
    }

    /// Converts every result family present in the result set.
    pub fn convert(mut self) -> Result<TableSet> {
        self.create_buses()?;
        self.create_lines()?;
        self.create_ext_grids()?;
        self.create_shunts()?;
        self.create_sgens()?;
        self.create_trafos()?;
        self.create_trafos3w()?;
        self.create_loads()?;
        Ok(self.tables)
    }

    fn unpopulated(&self, table: &'static str) -> Result<()> {
        if self.tables.contains(table) {
            return Err(ConvertError::FamilyAlreadyPopulated(table));
        }
        Ok(())
    }

    fn voltages(&self, nodes: impl Iterator<Item = Id>) -> Result<(Vec<f64>, Vec<f64>)> {
        let mut vm_pu = Vec::new();
        let mut va_degree = Vec::new();
        for node in nodes {
            let (u_pu, u_degree) = self.voltages.get(node)?;
            vm_pu.push(u_pu);
            va_degree.push(u_degree);
        }
        Ok((vm_pu, va_degree))
    }

    fn insert(&mut self, name: &str, table: Table) {
        log::info!("converted {} {} results", table.len(), name);
        self.tables.insert(name, table);
    }

    pub fn create_buses(&mut self) -> Result<()> {
        self.unpopulated("bus")?;
        let (input, output) = (self.input, self.output);
        let Some(nodes) = &output.node else {
            return Ok(());
        };

        let mut accumulator = NodePowerAccumulator::new();
        accumulator.add_branches("line", &input.line, &output.line)?;
        accumulator.add_branches("link", &input.link, &output.link)?;
        accumulator.add_branches(
            "transformer",
            &input.transformer,
            &output.transformer,
        )?;
        accumulator.add_branch3s(
            "three_winding_transformer",
            &input.three_winding_transformer,
            &output.three_winding_transformer,
        )?;

        let index = self.ids.to_source("bus", &ids(nodes), None)?;
        let (p_mw, q_mvar): (Vec<f64>, Vec<f64>) =
            nodes.iter().map(|n| accumulator.total(n.id)).unzip();
        let table = Table::new(index)
            .with_column("vm_pu", nodes.iter().map(|n| n.u_pu).collect::<Vec<_>>())
            .with_column(
                "va_degree",
                nodes.iter().map(|n| n.u_angle.to_degrees()).collect::<Vec<_>>(),
            )
            .with_column("p_mw", p_mw)
            .with_column("q_mvar", q_mvar);

        self.insert("bus", table);
        Ok(())
    }

    pub fn create_lines(&mut self) -> Result<()> {
        self.unpopulated("line")?;
        let (input, output) = (self.input, self.output);
        let Some(results) = &output.line else {
            return Ok(());
        };
        let lines = join("line", &input.line, results)?;
        let (vm_from_pu, va_from_degree) = self.voltages(lines.iter().map(|(l, _)| l.from_node))?;
        let (vm_to_pu, va_to_degree) = self.voltages(lines.iter().map(|(l, _)| l.to_node))?;

        let column = |f: fn(&BranchOutput) -> f64| -> Vec<f64> {
            results.iter().map(f).collect()
        };
        let table = Table::new(self.ids.to_source("line", &ids(results), None)?)
            .with_column("p_from_mw", column(|r| r.p_from * 1e-6))
            .with_column("q_from_mvar", column(|r| r.q_from * 1e-6))
            .with_column("p_to_mw", column(|r| r.p_to * 1e-6))
            .with_column("q_to_mvar", column(|r| r.q_to * 1e-6))
            .with_column("pl_mw", column(|r| (r.p_from + r.p_to) * 1e-6))
            .with_column("ql_mvar", column(|r| (r.q_from + r.q_to) * 1e-6))
            .with_column("i_from_ka", column(|r| r.i_from * 1e-3))
            .with_column("i_to_ka", column(|r| r.i_to * 1e-3))
            .with_column("i_ka", column(|r| r.i_from.max(r.i_to) * 1e-3))
            .with_column("vm_from_pu", vm_from_pu)
            .with_column("vm_to_pu", vm_to_pu)
            .with_column("va_from_degree", va_from_degree)
            .with_column("va_to_degree", va_to_degree)
            .with_column("loading_percent", column(|r| r.loading * 1e2));

        self.insert("line", table);
        Ok(())
    }

    pub fn create_ext_grids(&mut self) -> Result<()> {
        self.unpopulated("ext_grid")?;
        let (input, output) = (self.input, self.output);
        let Some(results) = &output.source else {
            return Ok(());
        };
        join("source", &input.source, results)?;

        let table = Table::new(self.ids.to_source("ext_grid", &ids(results), None)?)
            .with_column("p_mw", results.iter().map(|r| r.p * 1e-6).collect::<Vec<_>>())
            .with_column("q_mvar", results.iter().map(|r| r.q * 1e-6).collect::<Vec<_>>());

        self.insert("ext_grid", table);
        Ok(())
    }

    fn appliance_table<T: Appliance>(
        &self,
        family: &'static str,
        table: &str,
        input: &Option<Vec<T>>,
        results: &[ApplianceOutput],
    ) -> Result<Table> {
        let appliances = join(family, input, results)?;
        let (vm_pu, _) = self.voltages(appliances.iter().map(|(a, _)| a.node()))?;

        Ok(Table::new(self.ids.to_source(table, &ids(results), None)?)
            .with_column("p_mw", results.iter().map(|r| r.p * 1e-6).collect::<Vec<_>>())
            .with_column("q_mvar", results.iter().map(|r| r.q * 1e-6).collect::<Vec<_>>())
            .with_column("vm_pu", vm_pu))
    }

    pub fn create_shunts(&mut self) -> Result<()> {
        self.unpopulated("shunt")?;
        let (input, output) = (self.input, self.output);
        let Some(results) = &output.shunt else {
            return Ok(());
        };
        let table = self.appliance_table("shunt", "shunt", &input.shunt, results)?;
        self.insert("shunt", table);
        Ok(())
    }

    pub fn create_sgens(&mut self) -> Result<()> {
        self.unpopulated("sgen")?;
        let (input, output) = (self.input, self.output);
        let Some(results) = &output.sym_gen else {
            return Ok(());
        };
        let table = self.appliance_table("sym_gen", "sgen", &input.sym_gen, results)?;
        self.insert("sgen", table);
        Ok(())
    }

    pub fn create_trafos(&mut self) -> Result<()> {
        self.unpopulated("trafo")?;
        let (input, output) = (self.input, self.output);
        let Some(results) = &output.transformer else {
            return Ok(());
        };
        let trafos = join("transformer", &input.transformer, results)?;
        let (vm_hv_pu, va_hv_degree) = self.voltages(trafos.iter().map(|(t, _)| t.from_node))?;
        let (vm_lv_pu, va_lv_degree) = self.voltages(trafos.iter().map(|(t, _)| t.to_node))?;

        let column = |f: fn(&BranchOutput) -> f64| -> Vec<f64> {
            results.iter().map(f).collect()
        };
        let table = Table::new(self.ids.to_source("trafo", &ids(results), None)?)
            .with_column("p_hv_mw", column(|r| r.p_from * 1e-6))
            .with_column("q_hv_mvar", column(|r| r.q_from * 1e-6))
            .with_column("p_lv_mw", column(|r| r.p_to * 1e-6))
            .with_column("q_lv_mvar", column(|r| r.q_to * 1e-6))
            .with_column("pl_mw", column(|r| (r.p_from + r.p_to) * 1e-6))
            .with_column("ql_mvar", column(|r| (r.q_from + r.q_to) * 1e-6))
            .with_column("i_hv_ka", column(|r| r.i_from * 1e-3))
            .with_column("i_lv_ka", column(|r| r.i_to * 1e-3))
            .with_column("vm_hv_pu", vm_hv_pu)
            .with_column("vm_lv_pu", vm_lv_pu)
            .with_column("va_hv_degree", va_hv_degree)
            .with_column("va_lv_degree", va_lv_degree)
            .with_column("loading_percent", column(|r| r.loading * 1e2));

        self.insert("trafo", table);
        Ok(())
    }

    pub fn create_trafos3w(&mut self) -> Result<()> {
        self.unpopulated("trafo3w")?;
        let (input, output) = (self.input, self.output);
        let Some(results) = &output.three_winding_transformer else {
            return Ok(());
        };
        let trafos = join(
            "three_winding_transformer",
            &input.three_winding_transformer,
            results,
        )?;
        let (vm_hv_pu, va_hv_degree) = self.voltages(trafos.iter().map(|(t, _)| t.node_1))?;
        let (vm_mv_pu, va_mv_degree) = self.voltages(trafos.iter().map(|(t, _)| t.node_2))?;
        let (vm_lv_pu, va_lv_degree) = self.voltages(trafos.iter().map(|(t, _)| t.node_3))?;

        let column = |f: fn(&Branch3Output) -> f64| -> Vec<f64> {
            results.iter().map(f).collect()
        };
        let table = Table::new(self.ids.to_source("trafo3w", &ids(results), None)?)
            .with_column("p_hv_mw", column(|r| r.p_1 * 1e-6))
            .with_column("q_hv_mvar", column(|r| r.q_1 * 1e-6))
            .with_column("p_mv_mw", column(|r| r.p_2 * 1e-6))
            .with_column("q_mv_mvar", column(|r| r.q_2 * 1e-6))
            .with_column("p_lv_mw", column(|r| r.p_3 * 1e-6))
            .with_column("q_lv_mvar", column(|r| r.q_3 * 1e-6))
            .with_column("pl_mw", column(|r| (r.p_1 + r.p_2 + r.p_3) * 1e-6))
            .with_column("ql_mvar", column(|r| (r.q_1 + r.q_2 + r.q_3) * 1e-6))
            .with_column("i_hv_ka", column(|r| r.i_1 * 1e-3))
            .with_column("i_mv_ka", column(|r| r.i_2 * 1e-3))
            .with_column("i_lv_ka", column(|r| r.i_3 * 1e-3))
            .with_column("vm_hv_pu", vm_hv_pu)
            .with_column("vm_mv_pu", vm_mv_pu)
            .with_column("vm_lv_pu", vm_lv_pu)
            .with_column("va_hv_degree", va_hv_degree)
            .with_column("va_mv_degree", va_mv_degree)
            .with_column("va_lv_degree", va_lv_degree)
            .with_column("loading_percent", column(|r| r.loading * 1e2));

        self.insert("trafo3w", table);
        Ok(())
    }

    /// Sums the sym_load results that stem from the same load row. Rows
    /// appear in order of their first result record.
    pub fn create_loads(&mut self) -> Result<()> {
        self.unpopulated("load")?;
        let (input, output) = (self.input, self.output);
        let Some(results) = &output.sym_load else {
            return Ok(());
        };
        join("sym_load", &input.sym_load, results)?;

        let mut index: Vec<i64> = Vec::new();
        let mut sums: HashMap<i64, (f64, f64)> = HashMap::new();
        for result in results {
            let reference = self.ids.resolve(result.id)?;
            if reference.table != "load" {
                return Err(ConvertError::InconsistentIdReference {
                    id: result.id,
                    reason: format!("sym_load refers to table '{}'", reference.table),
                });
            }
            let sum = sums.entry(reference.index).or_insert_with(|| {
                index.push(reference.index);
                (0.0, 0.0)
            });
            sum.0 += result.p;
            sum.1 += result.q;
        }

        let (p_mw, q_mvar): (Vec<f64>, Vec<f64>) = index
            .iter()
            .map(|i| (sums[i].0 * 1e-6, sums[i].1 * 1e-6))
            .unzip();
        let table = Table::new(index)
            .with_column("p_mw", p_mw)
            .with_column("q_mvar", q_mvar);

        self.insert("load", table);
        Ok(())
    }
}
