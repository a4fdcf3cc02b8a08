use crate::ids::IdGroup;
use crate::pgm::Id;

/// Errors raised while converting between source tables and target arrays.
///
/// Every variant aborts the current conversion pass.
#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("indexes have already been created for {0}")]
    DuplicateGroup(IdGroup),

    #[error("no indexes have been created for {0}")]
    UnknownGroup(IdGroup),

    #[error("id {0} was never allocated")]
    UnknownId(Id),

    #[error("source index {index} is not part of {group}")]
    UnknownSourceIndex { group: IdGroup, index: i64 },

    #[error("inconsistent id reference for id {id}: {reason}")]
    InconsistentIdReference { id: Id, reason: String },

    #[error("no '{attribute}' value for '{table}'")]
    MissingAttribute { table: String, attribute: String },

    #[error("std_type '{std_type}' is not defined for '{table}'")]
    UnknownStdType { table: String, std_type: String },

    #[error("'{table}.{attribute}' cannot be read as {expected}")]
    AttributeType {
        table: String,
        attribute: String,
        expected: &'static str,
    },

    #[error("column '{table}.{column}' has {actual} values, expected {expected}")]
    ColumnLength {
        table: String,
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid transformer connection string: '{0}'")]
    InvalidVectorGroup(String),

    #[error("invalid tap side '{side}' for '{table}'")]
    InvalidTapSide { table: String, side: String },

    #[error("'{0}' has already been populated in this pass")]
    FamilyAlreadyPopulated(&'static str),

    #[error("'{0}' data is needed to convert the results")]
    MissingPrerequisiteDataset(&'static str),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
