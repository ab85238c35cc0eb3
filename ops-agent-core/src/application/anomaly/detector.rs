//! Keyword classification of an alarm into entity type and anomaly kind.
//!
//! Groups are tried in order and the first whose entity keywords appear claims
//! the alarm; within it the first matching rule decides the kind. When no rule
//! fires, a few generic keywords still yield a low-confidence guess.

use super::models::{AlarmEvent, AnomalyKind, AnomalyType, EntityType};
use serde_json::Value;
use tracing::{debug, info};

const DEFAULT_CONFIDENCE: f64 = 0.5;

struct Rule {
    kind: AnomalyKind,
    keywords: &'static [&'static str],
    confidence: f64,
    reasoning: &'static str,
}

struct Group {
    entity: EntityType,
    keywords: &'static [&'static str],
    rules: &'static [Rule],
}

const fn rule(
    kind: AnomalyKind,
    keywords: &'static [&'static str],
    confidence: f64,
    reasoning: &'static str,
) -> Rule {
    Rule {
        kind,
        keywords,
        confidence,
        reasoning,
    }
}

const GROUPS: &[Group] = &[
    Group {
        entity: EntityType::Pod,
        keywords: &["pod", "容器", "container", "k8s", "kubernetes"],
        rules: &[
            rule(AnomalyKind::PodCpu, &["cpu", "算力", "计算", "处理器"], 1.0, "alarm mentions a pod and CPU"),
            rule(AnomalyKind::PodMemory, &["内存", "memory", "ram", "mem", "oom"], 1.0, "alarm mentions a pod and memory"),
            rule(AnomalyKind::PodDiskio, &["磁盘io", "diskio", "磁盘i/o", "io压力", "iops"], 1.0, "alarm mentions a pod and disk IO"),
            rule(AnomalyKind::PodCrash, &["crash", "崩溃", "异常退出", "exit", "terminated"], 1.0, "alarm mentions a pod crash"),
            rule(AnomalyKind::PodRestart, &["重启", "restart", "restarted", "重启中"], 1.0, "alarm mentions a pod restart"),
            rule(AnomalyKind::PodError, &["错误", "error", "失败", "fail", "failed"], 0.7, "alarm mentions a pod and an error"),
        ],
    },
    Group {
        entity: EntityType::Node,
        keywords: &["node", "节点", "主机", "host", "server"],
        rules: &[
            rule(AnomalyKind::NodeCpu, &["cpu", "算力", "计算", "处理器", "processor"], 1.0, "alarm mentions a node and CPU"),
            rule(AnomalyKind::NodeMemory, &["内存", "memory", "ram", "mem"], 1.0, "alarm mentions a node and memory"),
            rule(AnomalyKind::NodeDiskio, &["磁盘io", "diskio", "磁盘i/o", "io压力", "iops", "disk io"], 1.0, "alarm mentions a node and disk IO"),
            rule(AnomalyKind::NodeDisk, &["磁盘", "disk", "存储空间", "storage", "空间不足"], 1.0, "alarm mentions a node and disk space"),
            rule(AnomalyKind::NodeNetwork, &["网络", "network", "带宽", "bandwidth", "流量"], 1.0, "alarm mentions a node and its network"),
        ],
    },
    Group {
        entity: EntityType::Service,
        keywords: &["service", "服务", "api", "接口", "endpoint"],
        rules: &[
            rule(AnomalyKind::ServiceHttp5xx, &["5xx", "500", "502", "503", "504", "服务器错误", "server error"], 0.9, "alarm mentions a service and HTTP 5xx"),
            rule(AnomalyKind::ServiceHttp4xx, &["4xx", "400", "404", "401", "403", "客户端错误", "client error"], 0.9, "alarm mentions a service and HTTP 4xx"),
            rule(AnomalyKind::ServiceError, &["响应码", "http", "错误", "error", "异常"], 1.0, "alarm mentions a service and an error"),
            rule(AnomalyKind::ServiceSlow, &["慢", "slow", "响应", "response", "延迟", "latency", "耗时"], 1.0, "alarm mentions a slow service"),
            rule(AnomalyKind::ServiceTimeout, &["timeout", "超时", "请求超时", "连接超时"], 0.9, "alarm mentions a service timeout"),
            rule(AnomalyKind::ServiceDown, &["down", "不可用", "宕机", "unavailable", "offline"], 0.9, "alarm mentions an unavailable service"),
        ],
    },
    Group {
        entity: EntityType::Application,
        keywords: &["application", "应用", "app", "程序", "应用服务"],
        rules: &[
            rule(AnomalyKind::ApplicationError, &["错误", "error", "异常", "exception", "失败"], 1.0, "alarm mentions an application error"),
            rule(AnomalyKind::ApplicationSlow, &["慢", "slow", "响应", "性能", "performance"], 1.0, "alarm mentions a slow application"),
            rule(AnomalyKind::ApplicationException, &["异常", "exception", "异常堆栈"], 1.0, "alarm mentions an application exception"),
            rule(AnomalyKind::ApplicationDeployment, &["部署", "deployment", "部署失败", "deploy failed"], 1.0, "alarm mentions a failed deployment"),
        ],
    },
    Group {
        entity: EntityType::Database,
        keywords: &["database", "数据库", "db", "mysql", "postgresql", "redis", "mongodb"],
        rules: &[
            rule(AnomalyKind::DatabaseConnectionfailure, &["连接", "connection", "连接失败", "connection failed", "无法连接"], 0.9, "alarm mentions a database connection failure"),
            rule(AnomalyKind::DatabaseSlow, &["慢", "slow", "查询慢", "slow query", "性能"], 1.0, "alarm mentions a slow database"),
            rule(AnomalyKind::DatabaseError, &["错误", "error", "异常", "失败"], 1.0, "alarm mentions a database error"),
            rule(AnomalyKind::DatabaseDatacorruption, &["数据损坏", "data corruption", "数据完整性", "integrity"], 0.9, "alarm mentions database corruption"),
        ],
    },
    Group {
        entity: EntityType::Network,
        keywords: &["network", "网络", "网络连接", "network connection"],
        rules: &[
            rule(AnomalyKind::NetworkNetwork, &["流量", "traffic", "带宽", "bandwidth", "流量异常"], 1.0, "alarm mentions network traffic"),
            rule(AnomalyKind::NetworkLatency, &["延迟", "latency", "延迟过高", "高延迟"], 1.0, "alarm mentions network latency"),
            rule(AnomalyKind::NetworkConnectionfailure, &["连接失败", "connection failure", "无法连接", "连接断开"], 0.9, "alarm mentions a network connection failure"),
        ],
    },
    Group {
        entity: EntityType::Storage,
        keywords: &["storage", "存储", "volume", "pv", "pvc"],
        rules: &[
            rule(AnomalyKind::StorageDisk, &["磁盘", "disk", "空间", "容量", "空间不足"], 1.0, "alarm mentions storage disk space"),
            rule(AnomalyKind::StorageIo, &["io", "i/o", "io异常", "io error"], 1.0, "alarm mentions storage IO"),
            rule(AnomalyKind::StorageCapacity, &["容量", "capacity", "容量超限", "容量不足"], 1.0, "alarm mentions storage capacity"),
        ],
    },
];

const GENERIC_RULES: &[Rule] = &[
    rule(AnomalyKind::ServiceError, &["响应码", "http", "错误", "error", "异常"], 0.6, "error keywords suggest a service error"),
    rule(AnomalyKind::PodError, &["pod", "容器", "container"], 0.6, "pod keywords suggest a pod error"),
    rule(AnomalyKind::NodeCpu, &["node", "节点", "主机"], 0.5, "node keywords suggest a node anomaly"),
];

/// Lowercased message, metadata and source, the text every keyword is matched against.
pub fn alarm_text(alarm: &AlarmEvent) -> String {
    let metadata = Value::Object(alarm.metadata.clone()).to_string();
    format!("{} {} {}", alarm.message, metadata, alarm.source).to_lowercase()
}

fn mentions(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

pub fn detect(alarm: &AlarmEvent) -> AnomalyType {
    let text = alarm_text(alarm);
    debug!(event_id = %alarm.event_id, text = %crate::summarise(&text), "Classifying alarm");

    let mut entity = EntityType::Unknown;
    let mut matched: Option<&Rule> = None;
    if let Some(group) = GROUPS.iter().find(|group| mentions(&text, group.keywords)) {
        entity = group.entity;
        matched = group.rules.iter().find(|rule| mentions(&text, rule.keywords));
    }
    if matched.is_none() {
        matched = GENERIC_RULES.iter().find(|rule| mentions(&text, rule.keywords));
        if let Some(rule) = matched {
            entity = rule.kind.entity_type();
        }
    }

    let detected = match matched {
        Some(rule) => AnomalyType {
            entity_type: entity,
            kind: rule.kind,
            type_name: rule.kind.description().to_string(),
            confidence: rule.confidence,
            reasoning: rule.reasoning.to_string(),
        },
        None => AnomalyType {
            entity_type: entity,
            kind: AnomalyKind::Unknown,
            type_name: AnomalyKind::Unknown.description().to_string(),
            confidence: DEFAULT_CONFIDENCE,
            reasoning: "no anomaly keywords found in the alarm".to_string(),
        },
    };
    info!(
        event_id = %alarm.event_id,
        entity = detected.entity_type.as_str(),
        anomaly = detected.kind.type_id(),
        confidence = detected.confidence,
        "Alarm classified"
    );
    detected
}
