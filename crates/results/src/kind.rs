//! Resource kinds stored in Tekton Results.

use std::fmt;

/// Static description of a resource kind.
#[derive(Debug)]
pub struct KindTraits {
    /// Human readable kind name.
    pub display_name: &'static str,
    /// `data_type` values the Results API stores for this kind, one per API version.
    pub data_types: &'static [&'static str],
    /// Records of this kind may live under another resource's result.
    pub may_nest_under_parent: bool,
}

const PIPELINE_RUN: KindTraits = KindTraits {
    display_name: "PipelineRun",
    data_types: &["tekton.dev/v1.PipelineRun", "tekton.dev/v1beta1.PipelineRun"],
    may_nest_under_parent: false,
};

// TaskRuns started by a PipelineRun are recorded under the PipelineRun's result.
const TASK_RUN: KindTraits = KindTraits {
    display_name: "TaskRun",
    data_types: &["tekton.dev/v1.TaskRun", "tekton.dev/v1beta1.TaskRun"],
    may_nest_under_parent: true,
};

/// Kind of run to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunKind {
    PipelineRun,
    TaskRun,
}

impl RunKind {
    /// Static traits for this kind.
    #[must_use]
    pub const fn traits(self) -> &'static KindTraits {
        match self {
            Self::PipelineRun => &PIPELINE_RUN,
            Self::TaskRun => &TASK_RUN,
        }
    }

    #[must_use]
    pub const fn data_types(self) -> &'static [&'static str] {
        self.traits().data_types
    }

    #[must_use]
    pub const fn may_nest_under_parent(self) -> bool {
        self.traits().may_nest_under_parent
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        self.traits().display_name
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PipelineRun => write!(f, "pipelinerun"),
            Self::TaskRun => write!(f, "taskrun"),
        }
    }
}
