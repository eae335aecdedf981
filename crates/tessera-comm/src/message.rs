//! Typed messages and the phase tags that label them.

use std::fmt;

use tessera_matrix::{DenseBlock, SparseMatrix};

/// Algorithm phase a message belongs to.
///
/// Both ends of a transfer name the phase; a receive that finds a different
/// tag fails with [`CommError::PhaseMismatch`](crate::CommError::PhaseMismatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseTag {
    Setup,
    Split,
    Scatter,
    ReplicateA,
    ReplicateB,
    Rotate,
    ReduceC,
    GatherGroup,
    GatherRoot,
    CountGe,
}

impl fmt::Display for PhaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PhaseTag::Setup => "setup",
            PhaseTag::Split => "split",
            PhaseTag::Scatter => "scatter",
            PhaseTag::ReplicateA => "replicate-a",
            PhaseTag::ReplicateB => "replicate-b",
            PhaseTag::Rotate => "rotate",
            PhaseTag::ReduceC => "reduce-c",
            PhaseTag::GatherGroup => "gather-group",
            PhaseTag::GatherRoot => "gather-root",
            PhaseTag::CountGe => "count-ge",
        };
        write!(f, "{}", name)
    }
}

/// Kind of value carried by a [`Payload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Index,
    Count,
    Keys,
    Header,
    Sparse,
    Dense,
    Abort,
}

/// Shape summary sent ahead of a matrix by
/// [`ProcessGroup::broadcast_framed`](crate::ProcessGroup::broadcast_framed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: PayloadKind,
    pub rows: usize,
    pub columns: usize,
    pub base: usize,
    pub len: usize,
}

impl Header {
    fn scalar(kind: PayloadKind) -> Self {
        Self {
            kind,
            rows: 0,
            columns: 0,
            base: 0,
            len: 1,
        }
    }
}

/// Wire representation of every value ranks exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Index(usize),
    Count(u64),
    Keys(Vec<usize>),
    Header(Header),
    Sparse(SparseMatrix),
    Dense(DenseBlock),
    Abort(String),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Index(_) => PayloadKind::Index,
            Payload::Count(_) => PayloadKind::Count,
            Payload::Keys(_) => PayloadKind::Keys,
            Payload::Header(_) => PayloadKind::Header,
            Payload::Sparse(_) => PayloadKind::Sparse,
            Payload::Dense(_) => PayloadKind::Dense,
            Payload::Abort(_) => PayloadKind::Abort,
        }
    }
}

/// A value that can travel between ranks.
pub trait Message: Sized + Send + 'static {
    /// Payload kind this type travels as.
    const KIND: PayloadKind;

    fn into_payload(self) -> Payload;

    /// Recover the value, or `None` if the payload holds another kind.
    fn from_payload(payload: Payload) -> Option<Self>;

    /// Shape summary used to validate framed transfers.
    fn header(&self) -> Header;
}

impl Message for usize {
    const KIND: PayloadKind = PayloadKind::Index;

    fn into_payload(self) -> Payload {
        Payload::Index(self)
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Index(v) => Some(v),
            _ => None,
        }
    }

    fn header(&self) -> Header {
        Header::scalar(Self::KIND)
    }
}

impl Message for u64 {
    const KIND: PayloadKind = PayloadKind::Count;

    fn into_payload(self) -> Payload {
        Payload::Count(self)
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Count(v) => Some(v),
            _ => None,
        }
    }

    fn header(&self) -> Header {
        Header::scalar(Self::KIND)
    }
}

impl Message for Vec<usize> {
    const KIND: PayloadKind = PayloadKind::Keys;

    fn into_payload(self) -> Payload {
        Payload::Keys(self)
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Keys(v) => Some(v),
            _ => None,
        }
    }

    fn header(&self) -> Header {
        Header {
            len: self.len(),
            ..Header::scalar(Self::KIND)
        }
    }
}

impl Message for Header {
    const KIND: PayloadKind = PayloadKind::Header;

    fn into_payload(self) -> Payload {
        Payload::Header(self)
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Header(h) => Some(h),
            _ => None,
        }
    }

    fn header(&self) -> Header {
        Header::scalar(Self::KIND)
    }
}

impl Message for SparseMatrix {
    const KIND: PayloadKind = PayloadKind::Sparse;

    fn into_payload(self) -> Payload {
        Payload::Sparse(self)
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Sparse(m) => Some(m),
            _ => None,
        }
    }

    fn header(&self) -> Header {
        Header {
            kind: Self::KIND,
            rows: self.dim(),
            columns: self.dim(),
            base: 0,
            len: self.nnz(),
        }
    }
}

impl Message for DenseBlock {
    const KIND: PayloadKind = PayloadKind::Dense;

    fn into_payload(self) -> Payload {
        Payload::Dense(self)
    }

    fn from_payload(payload: Payload) -> Option<Self> {
        match payload {
            Payload::Dense(b) => Some(b),
            _ => None,
        }
    }

    fn header(&self) -> Header {
        Header {
            kind: Self::KIND,
            rows: self.logical_dim(),
            columns: self.column_count(),
            base: self.column_base(),
            len: self.logical_dim() * self.column_count(),
        }
    }
}
