//! Operation - 受け付ける操作の閉じた列挙
//!
//! 新しい操作を足すときは variant と `name()` / `arity()` を同時に増やす。
//! `match` が網羅的なので、どちらかを忘れるとコンパイルが通らない。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create an account from `[locator, password]`.
    CreateAccount,
}

impl Operation {
    pub const ALL: [Operation; 1] = [Operation::CreateAccount];

    /// Name used at the inbound boundary (`submit_operation`).
    pub fn name(self) -> &'static str {
        match self {
            Operation::CreateAccount => "create_account",
        }
    }

    /// Exact number of string arguments the operation takes.
    pub fn arity(self) -> usize {
        match self {
            Operation::CreateAccount => 2,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| DispatchError::UnknownOperation(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_account_takes_two_arguments() {
        assert_eq!(Operation::CreateAccount.arity(), 2);
    }

    #[test]
    fn parses_wire_names() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "delete_account".parse::<Operation>().unwrap_err();
        assert!(matches!(err, DispatchError::UnknownOperation(name) if name == "delete_account"));
    }

    #[test]
    fn serde_uses_the_wire_name() {
        let s = serde_json::to_string(&Operation::CreateAccount).unwrap();
        assert_eq!(s, "\"create_account\"");
    }
}
