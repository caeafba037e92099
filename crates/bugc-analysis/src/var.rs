//! The unit of liveness: either an SSA temporary or a (necessarily
//! memory-resident, post-C6) local.

use bugc_ir::{LocalId, TempId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VarId {
    Temp(TempId),
    Local(LocalId),
}

/// The `VarId` a `Value` reads, if any (constants and the calldata
/// pseudo-value carry nothing to track).
pub fn var_of(value: &Value) -> Option<VarId> {
    match value {
        Value::Temp(id, _) => Some(VarId::Temp(*id)),
        Value::Local(id, _) => Some(VarId::Local(*id)),
        Value::Const(..) | Value::CallData => None,
    }
}
