use super::StoreKey;

/// A queued write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    SetIfAbsent {
        key: StoreKey,
        member: String,
        score: f64,
    },
    Set {
        key: StoreKey,
        member: String,
        score: f64,
    },
    Increment {
        key: StoreKey,
        member: String,
        delta: f64,
    },
    Remove {
        key: StoreKey,
        member: String,
    },
    AddToSet {
        key: StoreKey,
        member: String,
    },
}

/// Compare condition for a guarded commit. `expected: None` means the member must be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Guard {
    pub key: StoreKey,
    pub member: String,
    pub expected: Option<f64>,
}

impl Guard {
    /// Whether `current` satisfies this guard.
    pub fn holds(&self, current: Option<f64>) -> bool {
        match (self.expected, current) {
            (None, None) => true,
            (Some(expected), Some(current)) => expected == current,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied,
    Conflict,
}

/// Batch of writes committed as one unit by [`super::ScoreStore::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    ops: Vec<WriteOp>,
    guard: Option<Guard>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the commit conditional on `key[member]` still being `expected`.
    pub fn guard(
        &mut self,
        key: StoreKey,
        member: impl Into<String>,
        expected: Option<f64>,
    ) -> &mut Self {
        self.guard = Some(Guard {
            key,
            member: member.into(),
            expected,
        });
        self
    }

    pub fn set_if_absent(
        &mut self,
        key: StoreKey,
        member: impl Into<String>,
        score: f64,
    ) -> &mut Self {
        self.ops.push(WriteOp::SetIfAbsent {
            key,
            member: member.into(),
            score,
        });
        self
    }

    pub fn set_score(&mut self, key: StoreKey, member: impl Into<String>, score: f64) -> &mut Self {
        self.ops.push(WriteOp::Set {
            key,
            member: member.into(),
            score,
        });
        self
    }

    pub fn increment_score(
        &mut self,
        key: StoreKey,
        member: impl Into<String>,
        delta: f64,
    ) -> &mut Self {
        self.ops.push(WriteOp::Increment {
            key,
            member: member.into(),
            delta,
        });
        self
    }

    pub fn remove_member(&mut self, key: StoreKey, member: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Remove {
            key,
            member: member.into(),
        });
        self
    }

    pub fn add_to_set(&mut self, key: StoreKey, member: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::AddToSet {
            key,
            member: member.into(),
        });
        self
    }

    pub fn guard_condition(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    pub fn into_parts(self) -> (Vec<WriteOp>, Option<Guard>) {
        (self.ops, self.guard)
    }
}
