use crate::attr::StdTypes;
use crate::error::Result;
use crate::ids::{ExtraInfo, IdReference, IdRegistry};
use crate::input::InputConverter;
use crate::output::OutputConverter;
use crate::pgm::{Id, InputData, OutputData};
use crate::table::TableSet;
use derive_builder::Builder;

#[derive(Debug, Clone, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
pub struct ConverterOptions {
    /// Nominal frequency of the network (Hz).
    pub system_frequency: f64,

    /// Equipment types that rows may refer to via `std_type`.
    pub std_types: StdTypes,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            system_frequency: 50.0,
            std_types: StdTypes::new(),
        }
    }
}

impl ConverterOptionsBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(f) = self.system_frequency {
            if !(f.is_finite() && f > 0.0) {
                return Err(format!("system frequency must be positive ({})", f));
            }
        }
        Ok(())
    }
}

/// Converts pandapower tables to power-grid-model input data, and
/// calculation results back to pandapower result tables.
///
/// The converter keeps the id registry of the last input conversion so
/// that results of that data set can be converted without a sidecar.
#[derive(Debug, Default)]
pub struct PandaPowerConverter {
    options: ConverterOptions,
    ids: IdRegistry,
}

impl PandaPowerConverter {
    pub fn new(options: ConverterOptions) -> Self {
        Self {
            options,
            ids: IdRegistry::new(),
        }
    }

    pub fn ids(&self) -> &IdRegistry {
        &self.ids
    }

    /// Starts a new pass: ids restart at 0. On failure the registry is left
    /// empty.
    pub fn convert_input(&mut self, tables: &TableSet) -> Result<InputData> {
        self.ids.clear();
        let data = InputConverter::new(
            tables,
            &self.options.std_types,
            &mut self.ids,
            self.options.system_frequency,
        )
        .convert();

        match data {
            Ok(data) => {
                log::info!("allocated {} ids", self.ids.next_id());
                Ok(data)
            }
            Err(err) => {
                self.ids.clear();
                Err(err)
            }
        }
    }

    /// Like `convert_input`, also returning the source reference of every
    /// allocated id.
    pub fn convert_input_with_extra_info(
        &mut self,
        tables: &TableSet,
    ) -> Result<(InputData, ExtraInfo)> {
        let data = self.convert_input(tables)?;
        Ok((data, self.ids.extra_info()))
    }

    /// Converts results to tables keyed by source index. With `extra_info`
    /// the registry is rebuilt from the sidecar first; otherwise the ids of
    /// the last input conversion are used.
    pub fn convert_output(
        &mut self,
        input: &InputData,
        output: &OutputData,
        extra_info: Option<&ExtraInfo>,
    ) -> Result<TableSet> {
        if let Some(extra_info) = extra_info {
            self.ids.rebuild_from_extra_info(extra_info)?;
        }
        OutputConverter::new(&self.ids, input, output).convert()
    }

    /// Target id of a single source row.
    pub fn get_id(&self, table: &str, index: i64, name: Option<&str>) -> Result<Id> {
        Ok(self.ids.to_target(table, &[index], name)?[0])
    }

    /// Source row of a single target id.
    pub fn lookup_id(&self, id: Id) -> Result<IdReference> {
        self.ids.resolve(id)
    }
}
