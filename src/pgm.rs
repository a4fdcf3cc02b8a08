use serde::{Deserialize, Deserializer, Serialize};

/// Target id, unique across all device families of one data set.
pub type Id = i32;

/// NaN is written to JSON as `null`; read it back as NaN.
fn nullable<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindingType {
    Wye = 0,
    WyeN = 1,
    Delta = 2,
    Zigzag = 3,
    ZigzagN = 4,
}

#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchSide {
    FromSide = 0,
    ToSide = 1,
}

#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch3Side {
    Side1 = 0,
    Side2 = 1,
    Side3 = 2,
}

#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadGenType {
    ConstPower = 0,
    ConstImpedance = 1,
    ConstCurrent = 2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInput {
    pub id: Id,

    /// Rated line-line voltage (V).
    pub u_rated: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineInput {
    pub id: Id,
    pub from_node: Id,
    pub to_node: Id,
    pub from_status: bool,
    pub to_status: bool,

    /// Positive-sequence series resistance (ohm).
    pub r1: f64,

    /// Positive-sequence series reactance (ohm).
    pub x1: f64,

    /// Positive-sequence shunt capacitance (F).
    pub c1: f64,

    /// Positive-sequence shunt loss factor (tan delta).
    #[serde(deserialize_with = "nullable")]
    pub tan1: f64,

    /// Rated current (A).
    pub i_n: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkInput {
    pub id: Id,
    pub from_node: Id,
    pub to_node: Id,
    pub from_status: bool,
    pub to_status: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInput {
    pub id: Id,
    pub node: Id,
    pub status: bool,

    /// Reference voltage (p.u.).
    pub u_ref: f64,

    /// Reference voltage angle (rad).
    pub u_ref_angle: f64,

    /// Short circuit power (VA).
    #[serde(deserialize_with = "nullable")]
    pub sk: f64,

    /// R/X ratio of the source impedance.
    #[serde(deserialize_with = "nullable")]
    pub rx_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuntInput {
    pub id: Id,
    pub node: Id,
    pub status: bool,

    /// Positive-sequence conductance (S).
    pub g1: f64,

    /// Positive-sequence susceptance (S).
    pub b1: f64,
}

/// Symmetric load or generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymApplianceInput {
    pub id: Id,
    pub node: Id,
    pub status: bool,

    #[serde(rename = "type")]
    pub load_gen_type: LoadGenType,

    /// Specified active power (W).
    pub p_specified: f64,

    /// Specified reactive power (VAr).
    pub q_specified: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerInput {
    pub id: Id,
    pub from_node: Id,
    pub to_node: Id,
    pub from_status: bool,
    pub to_status: bool,

    /// Rated voltage at from-side (V).
    pub u1: f64,

    /// Rated voltage at to-side (V).
    pub u2: f64,

    /// Rated power (VA).
    pub sn: f64,

    /// Relative short circuit voltage.
    pub uk: f64,

    /// Short circuit (copper) loss (W).
    pub pk: f64,

    /// Relative no-load current.
    pub i0: f64,

    /// No-load (iron) loss (W).
    pub p0: f64,

    pub winding_from: WindingType,
    pub winding_to: WindingType,

    /// Clock number of phase shift.
    pub clock: i8,

    pub tap_side: BranchSide,
    pub tap_pos: i64,
    pub tap_min: i64,
    pub tap_max: i64,
    pub tap_nom: i64,

    /// Voltage of one tap step (V).
    pub tap_size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreeWindingTransformerInput {
    pub id: Id,
    pub node_1: Id,
    pub node_2: Id,
    pub node_3: Id,
    pub status_1: bool,
    pub status_2: bool,
    pub status_3: bool,
    pub u1: f64,
    pub u2: f64,
    pub u3: f64,
    pub sn_1: f64,
    pub sn_2: f64,
    pub sn_3: f64,
    pub uk_12: f64,
    pub uk_13: f64,
    pub uk_23: f64,
    pub pk_12: f64,
    pub pk_13: f64,
    pub pk_23: f64,
    pub i0: f64,
    pub p0: f64,
    pub winding_1: WindingType,
    pub winding_2: WindingType,
    pub winding_3: WindingType,
    pub clock_12: i8,
    pub clock_13: i8,
    pub tap_side: Branch3Side,
    pub tap_pos: i64,
    pub tap_min: i64,
    pub tap_max: i64,
    pub tap_nom: i64,
    pub tap_size: f64,
}

/// InputData is the array model handed to the calculation core. A family
/// that is `None` has not been populated in this pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Vec<NodeInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<Vec<LineInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<SourceInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sym_load: Option<Vec<SymApplianceInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shunt: Option<Vec<ShuntInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<Vec<TransformerInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sym_gen: Option<Vec<SymApplianceInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub three_winding_transformer: Option<Vec<ThreeWindingTransformerInput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Vec<LinkInput>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    pub id: Id,
    #[serde(default)]
    pub energized: bool,

    /// Voltage magnitude (p.u.).
    pub u_pu: f64,

    /// Voltage magnitude (V).
    #[serde(default)]
    pub u: f64,

    /// Voltage angle (rad).
    pub u_angle: f64,
}

/// Result of a two-terminal branch (line, link, transformer).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchOutput {
    pub id: Id,
    #[serde(default)]
    pub energized: bool,
    #[serde(default)]
    pub loading: f64,
    pub p_from: f64,
    pub q_from: f64,
    #[serde(default)]
    pub i_from: f64,
    pub p_to: f64,
    pub q_to: f64,
    #[serde(default)]
    pub i_to: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branch3Output {
    pub id: Id,
    #[serde(default)]
    pub energized: bool,
    #[serde(default)]
    pub loading: f64,
    pub p_1: f64,
    pub q_1: f64,
    #[serde(default)]
    pub i_1: f64,
    pub p_2: f64,
    pub q_2: f64,
    #[serde(default)]
    pub i_2: f64,
    pub p_3: f64,
    pub q_3: f64,
    #[serde(default)]
    pub i_3: f64,
}

/// Result of a single-terminal appliance (source, load, generator, shunt).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplianceOutput {
    pub id: Id,
    #[serde(default)]
    pub energized: bool,
    pub p: f64,
    pub q: f64,
    #[serde(default)]
    pub i: f64,
}

/// OutputData is the result set produced by the calculation core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Vec<NodeOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<Vec<BranchOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Vec<BranchOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<Vec<BranchOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub three_winding_transformer: Option<Vec<Branch3Output>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<ApplianceOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sym_load: Option<Vec<ApplianceOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sym_gen: Option<Vec<ApplianceOutput>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shunt: Option<Vec<ApplianceOutput>>,
}

/// Records with a target id.
pub trait Component {
    fn id(&self) -> Id;
}

/// Input records with two terminal nodes.
pub trait Branch: Component {
    fn from_node(&self) -> Id;
    fn to_node(&self) -> Id;
}

/// Input records with three terminal nodes.
pub trait Branch3: Component {
    fn nodes(&self) -> [Id; 3];
}

/// Input records connected to a single node.
pub trait Appliance: Component {
    fn node(&self) -> Id;
}

macro_rules! impl_component {
    ($($t:ty),*) => {
        $(impl Component for $t {
            fn id(&self) -> Id {
                self.id
            }
        })*
    };
}

impl_component!(
    NodeInput,
    LineInput,
    LinkInput,
    SourceInput,
    ShuntInput,
    SymApplianceInput,
    TransformerInput,
    ThreeWindingTransformerInput,
    NodeOutput,
    BranchOutput,
    Branch3Output,
    ApplianceOutput
);

macro_rules! impl_branch {
    ($($t:ty),*) => {
        $(impl Branch for $t {
            fn from_node(&self) -> Id {
                self.from_node
            }
            fn to_node(&self) -> Id {
                self.to_node
            }
        })*
    };
}

impl_branch!(LineInput, LinkInput, TransformerInput);

impl Branch3 for ThreeWindingTransformerInput {
    fn nodes(&self) -> [Id; 3] {
        [self.node_1, self.node_2, self.node_3]
    }
}

macro_rules! impl_appliance {
    ($($t:ty),*) => {
        $(impl Appliance for $t {
            fn node(&self) -> Id {
                self.node
            }
        })*
    };
}

impl_appliance!(SourceInput, ShuntInput, SymApplianceInput);
