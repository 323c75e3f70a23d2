pub mod classifier;
pub mod provider;
pub mod remote;

pub use classifier::{Classifier, Probabilities, SoftmaxModel};
pub use provider::ModelProvider;
pub use remote::{ConfirmForm, DriveStore, RemoteStore};
