mod common;
mod derivation;
mod service;
