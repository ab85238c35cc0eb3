use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An alarm as received from a monitoring system or an alarm file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmEvent {
    pub event_id: String,
    pub timestamp: String,
    pub source: String,
    pub severity: String,
    pub message: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Node,
    Pod,
    Service,
    Application,
    Database,
    Network,
    Storage,
    Unknown,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Node => "node",
            EntityType::Pod => "pod",
            EntityType::Service => "service",
            EntityType::Application => "application",
            EntityType::Database => "database",
            EntityType::Network => "network",
            EntityType::Storage => "storage",
            EntityType::Unknown => "unknown",
        }
    }
}

/// Every anomaly the detector can name, grouped by the entity it affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    NodeCpu,
    NodeMemory,
    NodeDisk,
    NodeDiskio,
    NodeNetwork,
    PodCpu,
    PodMemory,
    PodDiskio,
    PodCrash,
    PodRestart,
    PodError,
    ServiceDown,
    ServiceSlow,
    ServiceLatency,
    ServiceError,
    ServiceHttp4xx,
    ServiceHttp5xx,
    ServiceTimeout,
    ApplicationSlow,
    ApplicationError,
    ApplicationException,
    ApplicationDeployment,
    DatabaseConnectionfailure,
    DatabaseSlow,
    DatabaseError,
    DatabaseDatacorruption,
    NetworkNetwork,
    NetworkLatency,
    NetworkConnectionfailure,
    StorageDisk,
    StorageIo,
    StorageCapacity,
    Unknown,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 33] = [
        AnomalyKind::NodeCpu,
        AnomalyKind::NodeMemory,
        AnomalyKind::NodeDisk,
        AnomalyKind::NodeDiskio,
        AnomalyKind::NodeNetwork,
        AnomalyKind::PodCpu,
        AnomalyKind::PodMemory,
        AnomalyKind::PodDiskio,
        AnomalyKind::PodCrash,
        AnomalyKind::PodRestart,
        AnomalyKind::PodError,
        AnomalyKind::ServiceDown,
        AnomalyKind::ServiceSlow,
        AnomalyKind::ServiceLatency,
        AnomalyKind::ServiceError,
        AnomalyKind::ServiceHttp4xx,
        AnomalyKind::ServiceHttp5xx,
        AnomalyKind::ServiceTimeout,
        AnomalyKind::ApplicationSlow,
        AnomalyKind::ApplicationError,
        AnomalyKind::ApplicationException,
        AnomalyKind::ApplicationDeployment,
        AnomalyKind::DatabaseConnectionfailure,
        AnomalyKind::DatabaseSlow,
        AnomalyKind::DatabaseError,
        AnomalyKind::DatabaseDatacorruption,
        AnomalyKind::NetworkNetwork,
        AnomalyKind::NetworkLatency,
        AnomalyKind::NetworkConnectionfailure,
        AnomalyKind::StorageDisk,
        AnomalyKind::StorageIo,
        AnomalyKind::StorageCapacity,
        AnomalyKind::Unknown,
    ];

    /// Stable identifier such as `node_cpu` or `service_http5xx`.
    pub fn type_id(&self) -> &'static str {
        match self {
            AnomalyKind::NodeCpu => "node_cpu",
            AnomalyKind::NodeMemory => "node_memory",
            AnomalyKind::NodeDisk => "node_disk",
            AnomalyKind::NodeDiskio => "node_diskio",
            AnomalyKind::NodeNetwork => "node_network",
            AnomalyKind::PodCpu => "pod_cpu",
            AnomalyKind::PodMemory => "pod_memory",
            AnomalyKind::PodDiskio => "pod_diskio",
            AnomalyKind::PodCrash => "pod_crash",
            AnomalyKind::PodRestart => "pod_restart",
            AnomalyKind::PodError => "pod_error",
            AnomalyKind::ServiceDown => "service_down",
            AnomalyKind::ServiceSlow => "service_slow",
            AnomalyKind::ServiceLatency => "service_latency",
            AnomalyKind::ServiceError => "service_error",
            AnomalyKind::ServiceHttp4xx => "service_http4xx",
            AnomalyKind::ServiceHttp5xx => "service_http5xx",
            AnomalyKind::ServiceTimeout => "service_timeout",
            AnomalyKind::ApplicationSlow => "application_slow",
            AnomalyKind::ApplicationError => "application_error",
            AnomalyKind::ApplicationException => "application_exception",
            AnomalyKind::ApplicationDeployment => "application_deployment",
            AnomalyKind::DatabaseConnectionfailure => "database_connectionfailure",
            AnomalyKind::DatabaseSlow => "database_slow",
            AnomalyKind::DatabaseError => "database_error",
            AnomalyKind::DatabaseDatacorruption => "database_datacorruption",
            AnomalyKind::NetworkNetwork => "network_network",
            AnomalyKind::NetworkLatency => "network_latency",
            AnomalyKind::NetworkConnectionfailure => "network_connectionfailure",
            AnomalyKind::StorageDisk => "storage_disk",
            AnomalyKind::StorageIo => "storage_io",
            AnomalyKind::StorageCapacity => "storage_capacity",
            AnomalyKind::Unknown => "unknown",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnomalyKind::NodeCpu => "Node CPU usage too high",
            AnomalyKind::NodeMemory => "Node memory usage too high",
            AnomalyKind::NodeDisk => "Node disk usage too high",
            AnomalyKind::NodeDiskio => "Node disk IO pressure too high",
            AnomalyKind::NodeNetwork => "Node network anomaly",
            AnomalyKind::PodCpu => "Pod CPU usage too high",
            AnomalyKind::PodMemory => "Pod memory usage too high",
            AnomalyKind::PodDiskio => "Pod disk IO pressure too high",
            AnomalyKind::PodCrash => "Pod crashed",
            AnomalyKind::PodRestart => "Pod restarted",
            AnomalyKind::PodError => "Pod error",
            AnomalyKind::ServiceDown => "Service unavailable",
            AnomalyKind::ServiceSlow => "Service responding slowly",
            AnomalyKind::ServiceLatency => "Service latency too high",
            AnomalyKind::ServiceError => "Service error",
            AnomalyKind::ServiceHttp4xx => "Service HTTP 4xx errors",
            AnomalyKind::ServiceHttp5xx => "Service HTTP 5xx errors",
            AnomalyKind::ServiceTimeout => "Service timeout",
            AnomalyKind::ApplicationSlow => "Application responding slowly",
            AnomalyKind::ApplicationError => "Application error",
            AnomalyKind::ApplicationException => "Application exception",
            AnomalyKind::ApplicationDeployment => "Application deployment failed",
            AnomalyKind::DatabaseConnectionfailure => "Database connection failure",
            AnomalyKind::DatabaseSlow => "Database responding slowly",
            AnomalyKind::DatabaseError => "Database error",
            AnomalyKind::DatabaseDatacorruption => "Database data corruption",
            AnomalyKind::NetworkNetwork => "Network traffic anomaly",
            AnomalyKind::NetworkLatency => "Network latency too high",
            AnomalyKind::NetworkConnectionfailure => "Network connection failure",
            AnomalyKind::StorageDisk => "Storage disk usage too high",
            AnomalyKind::StorageIo => "Storage IO anomaly",
            AnomalyKind::StorageCapacity => "Storage capacity exceeded",
            AnomalyKind::Unknown => "Unknown anomaly",
        }
    }

    /// The entity type encoded in the identifier prefix.
    pub fn entity_type(&self) -> EntityType {
        match self.type_id().split('_').next() {
            Some("node") => EntityType::Node,
            Some("pod") => EntityType::Pod,
            Some("service") => EntityType::Service,
            Some("application") => EntityType::Application,
            Some("database") => EntityType::Database,
            Some("network") => EntityType::Network,
            Some("storage") => EntityType::Storage,
            _ => EntityType::Unknown,
        }
    }

    pub fn from_type_id(type_id: &str) -> Option<AnomalyKind> {
        let wanted = type_id.trim().to_lowercase();
        Self::ALL.into_iter().find(|kind| kind.type_id() == wanted)
    }
}

/// Outcome of classifying one alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyType {
    pub entity_type: EntityType,
    pub kind: AnomalyKind,
    pub type_name: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// An entity that may be the origin of the alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePoint {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub entity_name: String,
    pub related_alarms: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Evidence that an entity is anomalous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub source: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub candidate: CandidatePoint,
    pub confidence: f64,
    pub confidence_interval: (f64, f64),
    pub indicators: Vec<Indicator>,
}

/// A reported anomaly with remediation advice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredPoint {
    pub entity_id: String,
    pub entity_type: EntityType,
    pub entity_name: String,
    pub confidence: f64,
    pub confidence_interval: (f64, f64),
    pub anomaly_type: String,
    pub timestamp: String,
    pub indicators: Vec<Indicator>,
    pub recommendations: Vec<String>,
}

/// Everything one alarm analysis produced; embedded in `results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub alarm: AlarmEvent,
    pub anomaly_type: AnomalyType,
    pub candidates: usize,
    pub scored: usize,
    pub points: Vec<DiscoveredPoint>,
    pub analysed_at: DateTime<Utc>,
}
