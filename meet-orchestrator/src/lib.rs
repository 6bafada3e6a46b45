pub mod dag;
pub mod engine;
pub mod models;
pub mod schema;
pub mod store;
pub mod task;
pub mod worker;

pub use dag::{DagBuilder, DagDef, Node, NodeKind};
pub use engine::Engine;
pub use models::{NewTaskInstance, NewWorkflowRun, RunStatus, TaskInstanceRow, TaskStatus, WorkflowRunRow};
pub use task::{ForkGenerator, ForkPlan, TaskContext, TaskDef, TaskError, TaskHandler, TaskOutput};
pub use worker::Registry;
