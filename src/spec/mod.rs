//! Cluster specification
//!
//! A [`ClusterSpec`] is the immutable identity of one GKE cluster: what to
//! call it, where to bill it, and what its nodes look like.

mod types;

pub use types::{AcceleratorSpec, GpuType};

use serde::Deserialize;

use crate::Error;

/// GKE cluster names are limited to 40 characters
pub const MAX_CLUSTER_NAME_LEN: usize = 40;

/// Desired shape of a GKE cluster
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Cluster name, unique within the project and zone
    pub name: String,

    /// Project that owns and is billed for the cluster
    pub project: String,

    /// Compute zone; gcloud's configured default is used when unset
    #[serde(default)]
    pub zone: Option<String>,

    /// Node machine type, e.g. `n1-standard-4`
    pub machine_type: String,

    /// Number of worker nodes
    pub num_nodes: u32,

    /// GPU model attached to every node
    #[serde(default)]
    pub gpu_type: Option<GpuType>,

    /// GPUs per node; the cluster is accelerator-equipped when positive
    #[serde(default)]
    pub gpu_count: u32,
}

impl ClusterSpec {
    /// True when nodes carry GPUs
    pub fn has_accelerators(&self) -> bool {
        self.gpu_count > 0
    }

    /// Accelerator request, present iff `gpu_count > 0` and a type is set
    pub fn accelerator(&self) -> Option<AcceleratorSpec> {
        if !self.has_accelerators() {
            return None;
        }
        self.gpu_type.map(|gpu_type| AcceleratorSpec {
            gpu_type,
            count: self.gpu_count,
        })
    }

    /// Validates the cluster specification
    pub fn validate(&self) -> Result<(), Error> {
        validate_cluster_name(&self.name)?;

        if self.project.trim().is_empty() {
            return Err(Error::validation("project must not be empty"));
        }
        if self.machine_type.trim().is_empty() {
            return Err(Error::validation("machine type must not be empty"));
        }
        if self.num_nodes == 0 {
            return Err(Error::validation("node count must be at least 1"));
        }
        if self.has_accelerators() && self.gpu_type.is_none() {
            return Err(Error::validation(format!(
                "gpu type is required when gpu count is {}",
                self.gpu_count
            )));
        }
        Ok(())
    }
}

/// Check a name against GKE's resource naming rules: lowercase letters,
/// digits and hyphens, starting with a letter and not ending with a hyphen.
fn validate_cluster_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::validation("cluster name must not be empty"));
    }
    if name.len() > MAX_CLUSTER_NAME_LEN {
        return Err(Error::validation(format!(
            "cluster name '{}' is longer than {} characters",
            name, MAX_CLUSTER_NAME_LEN
        )));
    }
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(Error::validation(format!(
            "cluster name '{}' must start with a lowercase letter",
            name
        )));
    }
    if name.ends_with('-') {
        return Err(Error::validation(format!(
            "cluster name '{}' must not end with a hyphen",
            name
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(Error::validation(format!(
            "cluster name '{}' contains invalid character '{}'",
            name, c
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> ClusterSpec {
        ClusterSpec {
            name: "c1".to_string(),
            project: "proj".to_string(),
            zone: None,
            machine_type: "n1-standard-4".to_string(),
            num_nodes: 3,
            gpu_type: None,
            gpu_count: 0,
        }
    }

    // ==========================================================================
    // Story: Accelerator detection
    // ==========================================================================

    #[test]
    fn cluster_without_gpus_has_no_accelerator() {
        let spec = sample_spec();
        assert!(!spec.has_accelerators());
        assert_eq!(spec.accelerator(), None);
    }

    #[test]
    fn gpu_type_without_count_is_not_accelerated() {
        let spec = ClusterSpec {
            gpu_type: Some(GpuType::K80),
            ..sample_spec()
        };
        assert!(!spec.has_accelerators());
        assert_eq!(spec.accelerator(), None);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn positive_gpu_count_yields_accelerator() {
        let spec = ClusterSpec {
            gpu_type: Some(GpuType::K80),
            gpu_count: 2,
            ..sample_spec()
        };
        assert_eq!(
            spec.accelerator(),
            Some(AcceleratorSpec {
                gpu_type: GpuType::K80,
                count: 2
            })
        );
    }

    // ==========================================================================
    // Story: Validation rejects specs gcloud would refuse
    // ==========================================================================

    #[test]
    fn valid_spec_passes() {
        assert!(sample_spec().validate().is_ok());
    }

    #[test]
    fn zero_nodes_is_rejected() {
        let spec = ClusterSpec {
            num_nodes: 0,
            ..sample_spec()
        };
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn gpu_count_without_type_is_rejected() {
        let spec = ClusterSpec {
            gpu_count: 1,
            ..sample_spec()
        };
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("gpu type is required"));
    }

    #[test]
    fn empty_project_is_rejected() {
        let spec = ClusterSpec {
            project: " ".to_string(),
            ..sample_spec()
        };
        assert!(matches!(spec.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn cluster_names_follow_gke_rules() {
        assert!(validate_cluster_name("pkb-1234abcd").is_ok());
        assert!(validate_cluster_name(&"a".repeat(40)).is_ok());

        assert!(validate_cluster_name("").is_err());
        assert!(validate_cluster_name(&"a".repeat(41)).is_err());
        assert!(validate_cluster_name("1cluster").is_err());
        assert!(validate_cluster_name("My-Cluster").is_err());
        assert!(validate_cluster_name("cluster-").is_err());
        assert!(validate_cluster_name("my_cluster").is_err());
    }

    #[test]
    fn spec_deserializes_from_camel_case_yaml() {
        let yaml = r#"
name: c2
project: proj
zone: us-central1-a
machineType: n1-standard-8
numNodes: 2
gpuType: k80
gpuCount: 2
"#;
        let spec: ClusterSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.zone.as_deref(), Some("us-central1-a"));
        assert_eq!(spec.gpu_type, Some(GpuType::K80));
        assert_eq!(spec.gpu_count, 2);
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn gpu_fields_default_to_none() {
        let yaml = "name: c1\nproject: proj\nmachineType: n1-standard-4\nnumNodes: 3\n";
        let spec: ClusterSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec, sample_spec());
    }
}
