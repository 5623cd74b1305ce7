//! Operator kinds for the two tree families and their display labels.
//!
//! Candidate paths and selected plans live in disjoint tag universes even though several labels
//! recur in both, so each family gets its own closed enum with an explicit `Other` fallback.
use phf::phf_map;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::EnumIter)]
pub enum PathKind {
    SeqScan,
    IndexScan,
    BitmapHeapScan,
    TidScan,
    SubqueryScan,
    NestLoop,
    HashJoin,
    MergeJoin,
    Append,
    BitmapAnd,
    BitmapOr,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::EnumIter)]
pub enum PlanKind {
    SeqScan,
    IndexScan,
    BitmapHeapScan,
    TidScan,
    SubqueryScan,
    NestLoop,
    HashJoin,
    MergeJoin,
    Agg,
    Sort,
    Hash,
    Append,
    Other,
}

// Keyed by the host optimizer's node tag names.
static PATH_TAGS: phf::Map<&'static str, PathKind> = phf_map! {
    "T_Path" => PathKind::SeqScan,
    "T_IndexPath" => PathKind::IndexScan,
    "T_BitmapHeapPath" => PathKind::BitmapHeapScan,
    "T_TidPath" => PathKind::TidScan,
    "T_SubqueryScanPath" => PathKind::SubqueryScan,
    "T_NestPath" => PathKind::NestLoop,
    "T_HashPath" => PathKind::HashJoin,
    "T_MergePath" => PathKind::MergeJoin,
    "T_AppendPath" => PathKind::Append,
    "T_BitmapAndPath" => PathKind::BitmapAnd,
    "T_BitmapOrPath" => PathKind::BitmapOr,
};

static PLAN_TAGS: phf::Map<&'static str, PlanKind> = phf_map! {
    "T_SeqScan" => PlanKind::SeqScan,
    "T_IndexScan" => PlanKind::IndexScan,
    "T_BitmapHeapScan" => PlanKind::BitmapHeapScan,
    "T_TidScan" => PlanKind::TidScan,
    "T_SubqueryScan" => PlanKind::SubqueryScan,
    "T_NestLoop" => PlanKind::NestLoop,
    "T_HashJoin" => PlanKind::HashJoin,
    "T_MergeJoin" => PlanKind::MergeJoin,
    "T_Agg" => PlanKind::Agg,
    "T_Sort" => PlanKind::Sort,
    "T_Hash" => PlanKind::Hash,
    "T_Append" => PlanKind::Append,
};

impl PathKind {
    /// Classifies a raw host tag. Tags outside the known set become [`PathKind::Other`].
    pub fn from_tag(tag: &str) -> Self {
        PATH_TAGS.get(tag).copied().unwrap_or(Self::Other)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SeqScan => "Seq Scan",
            Self::IndexScan => "Index Scan",
            Self::BitmapHeapScan => "Bitmap Heap Scan",
            Self::TidScan => "TID Scan",
            Self::SubqueryScan => "Subquery Scan",
            Self::NestLoop => "Nested Loop Join",
            Self::HashJoin => "Hash Join",
            Self::MergeJoin => "Merge Join",
            Self::Append => "Append",
            Self::BitmapAnd => "Bitmap And",
            Self::BitmapOr => "Bitmap Or",
            Self::Other => "Other Path",
        }
    }

    /// Only join paths have operands worth descending into.
    pub fn is_join(self) -> bool {
        matches!(self, Self::NestLoop | Self::HashJoin | Self::MergeJoin)
    }
}

impl PlanKind {
    /// Classifies a raw host tag. Tags outside the known set become [`PlanKind::Other`].
    pub fn from_tag(tag: &str) -> Self {
        PLAN_TAGS.get(tag).copied().unwrap_or(Self::Other)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::SeqScan => "Seq Scan",
            Self::IndexScan => "Index Scan",
            Self::BitmapHeapScan => "Bitmap Heap Scan",
            Self::TidScan => "TID Scan",
            Self::SubqueryScan => "Subquery Scan",
            Self::NestLoop => "Nested Loop Join",
            Self::HashJoin => "Hash Join",
            Self::MergeJoin => "Merge Join",
            Self::Agg => "Aggregate",
            Self::Sort => "Sort",
            Self::Hash => "Hash",
            Self::Append => "Append",
            Self::Other => "Other Plan",
        }
    }
}

impl From<PathKind> for PlanKind {
    /// The plan operator a path of this kind turns into once selected.
    fn from(kind: PathKind) -> Self {
        match kind {
            PathKind::SeqScan => Self::SeqScan,
            PathKind::IndexScan => Self::IndexScan,
            PathKind::BitmapHeapScan => Self::BitmapHeapScan,
            PathKind::TidScan => Self::TidScan,
            PathKind::SubqueryScan => Self::SubqueryScan,
            PathKind::NestLoop => Self::NestLoop,
            PathKind::HashJoin => Self::HashJoin,
            PathKind::MergeJoin => Self::MergeJoin,
            PathKind::Append => Self::Append,
            PathKind::BitmapAnd | PathKind::BitmapOr | PathKind::Other => Self::Other,
        }
    }
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
