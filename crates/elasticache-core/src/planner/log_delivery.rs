//! Log delivery configuration changes
//!
//! The remote API has no implicit removal for log delivery entries: every
//! desired entry is submitted as an upsert, and every previously configured
//! log type that is no longer desired is submitted as an explicit disable.

use crate::model::{LogDeliveryConfiguration, LogDeliveryConfigurationRequest};
use std::collections::BTreeSet;

pub fn log_delivery_requests(
    old: &[LogDeliveryConfiguration],
    new: &[LogDeliveryConfiguration],
) -> Vec<LogDeliveryConfigurationRequest> {
    let submitted: BTreeSet<&str> = new.iter().map(|c| c.log_type.as_str()).collect();

    let mut requests: Vec<_> = new
        .iter()
        .map(LogDeliveryConfigurationRequest::enable)
        .collect();

    requests.extend(
        old.iter()
            .filter(|c| !submitted.contains(c.log_type.as_str()))
            .map(|c| LogDeliveryConfigurationRequest::disable(c.log_type.clone())),
    );

    requests
}
