pub mod recorder;

pub use recorder::VisitRecorder;
