pub mod default_collaborators;
