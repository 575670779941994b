use crate::error::{DiscoverError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 服务实例
///
/// `id`、`addr`、`proto` 在实例生命周期内不变，`meta` 由健康注册器持有并在锁内修改。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    pub addr: String,
    pub proto: String,
    pub meta: HashMap<String, String>,
}

impl Instance {
    /// 使用随机ID创建实例
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            addr: addr.into(),
            proto: "tcp".to_string(),
            meta: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = proto.into();
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// 拆分 `host:port`
    pub fn host_port(&self) -> Result<(String, u16)> {
        let (host, port) = self
            .addr
            .rsplit_once(':')
            .ok_or_else(|| DiscoverError::invalid_addr(&self.addr))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| DiscoverError::invalid_addr(&self.addr))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(DiscoverError::invalid_addr(&self.addr));
        }
        Ok((host.to_string(), port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_port() {
        let inst = Instance::new("10.0.0.1:8080");
        assert_eq!(inst.host_port().unwrap(), ("10.0.0.1".to_string(), 8080));

        let inst = Instance::new("[::1]:53");
        assert_eq!(inst.host_port().unwrap(), ("::1".to_string(), 53));
    }

    #[test]
    fn test_host_port_invalid() {
        for addr in ["10.0.0.1", ":8080", "host:port", "host:70000"] {
            match Instance::new(addr).host_port() {
                Err(DiscoverError::InvalidAddr(a)) => assert_eq!(a, addr),
                other => panic!("expected InvalidAddr for {}, got {:?}", addr, other),
            }
        }
    }

    #[test]
    fn test_new_generates_unique_ids() {
        let a = Instance::new("127.0.0.1:1");
        let b = Instance::new("127.0.0.1:1");
        assert_ne!(a.id, b.id);
        assert_eq!(a.proto, "tcp");
        assert!(a.meta.is_empty());
    }
}
