// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod evaluation;
mod logging;
mod policy;
mod routing;

pub use evaluation::{EvaluationConfig, EvaluationConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use policy::{PolicyConfig, PolicyConfigLayer};
pub use routing::{RoutingConfig, RoutingConfigLayer};
