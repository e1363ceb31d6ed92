//! Cross-module tests: end-to-end scenarios and pipeline properties.
