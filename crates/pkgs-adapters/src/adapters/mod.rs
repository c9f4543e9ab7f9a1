pub mod cargo;
pub mod docker;
pub mod github_actions;
pub mod npm;
pub mod pypi;
pub mod rubygems;

pub use cargo::CargoAdapter;
pub use docker::DockerAdapter;
pub use github_actions::GithubActionsAdapter;
pub use npm::NpmAdapter;
pub use pypi::PypiAdapter;
pub use rubygems::RubygemsAdapter;
