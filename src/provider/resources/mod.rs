//! Managed resources.

mod healthcheck;
mod incident;
mod incident_update;
mod maintenance;
mod monitor;
mod outage;
mod statuspage;
mod statuspage_subscriber;

use super::Resource;

pub(crate) use self::healthcheck::HealthcheckResource;
pub(crate) use self::incident::IncidentResource;
pub(crate) use self::incident_update::IncidentUpdateResource;
pub(crate) use self::maintenance::MaintenanceResource;
pub(crate) use self::monitor::MonitorResource;
pub(crate) use self::outage::OutageResource;
pub(crate) use self::statuspage::StatusPageResource;
pub(crate) use self::statuspage_subscriber::StatusPageSubscriberResource;

pub(crate) fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(MonitorResource),
        Box::new(HealthcheckResource),
        Box::new(OutageResource),
        Box::new(IncidentResource),
        Box::new(IncidentUpdateResource),
        Box::new(MaintenanceResource),
        Box::new(StatusPageResource),
        Box::new(StatusPageSubscriberResource),
    ]
}
