//! Performance messages.
//!
//! Every perf message shares the environment/test header in [`PerfMessage`];
//! the measured values live in a [`PerfDetail`] variant that is flattened into
//! the same JSON object and tagged by `perf_kind`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfMessage {
    pub time: DateTime<Utc>,
    pub elapsed: f64,
    pub tool: String,
    pub test_case_name: String,
    pub platform: String,
    pub location: String,
    pub host_version: String,
    pub guest_os_type: String,
    pub distro_version: String,
    pub vmsize: String,
    pub kernel_version: String,
    pub lis_version: String,
    pub ip_version: String,
    pub protocol_type: String,
    pub data_path: String,
    pub test_date: DateTime<Utc>,
    pub role: String,
    pub test_result_id: String,
    #[serde(flatten)]
    pub detail: PerfDetail,
}

impl PerfMessage {
    pub fn new(detail: PerfDetail) -> Self {
        let now = Utc::now();
        Self {
            time: now,
            elapsed: 0.0,
            tool: String::new(),
            test_case_name: String::new(),
            platform: String::new(),
            location: String::new(),
            host_version: String::new(),
            guest_os_type: "Linux".into(),
            distro_version: String::new(),
            vmsize: String::new(),
            kernel_version: String::new(),
            lis_version: String::new(),
            ip_version: "IPv4".into(),
            protocol_type: "TCP".into(),
            data_path: String::new(),
            test_date: now,
            role: String::new(),
            test_result_id: String::new(),
            detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "perf_kind", rename_all = "snake_case")]
pub enum PerfDetail {
    Disk(DiskPerformance),
    Cpu(CpuPerformance),
    NetworkTcp(NetworkTcpPerformance),
    NetworkUdp(NetworkUdpPerformance),
    NetworkLatency(NetworkLatencyPerformance),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiskSetupType {
    Unknown,
    #[default]
    Raw,
    Raid0,
}

/// Disk kind as reported in perf results; unrelated to the OS disk capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerfDiskType {
    Unknown,
    #[default]
    Nvme,
    PremiumSsd,
    UltraDisk,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskPerformance {
    pub disk_setup_type: DiskSetupType,
    pub block_size: u64,
    pub disk_type: PerfDiskType,
    pub core_count: u32,
    pub disk_count: u32,
    pub qdepth: u32,
    pub iodepth: u32,
    pub numjob: u32,
    pub read_iops: f64,
    pub read_lat_usec: f64,
    pub randread_iops: f64,
    pub randread_lat_usec: f64,
    pub write_iops: f64,
    pub write_lat_usec: f64,
    pub randwrite_iops: f64,
    pub randwrite_lat_usec: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuPerformance {
    pub benchmark: String,
    pub cpu_speed: f64,
    pub threads: u32,
    pub events: u64,
    pub total_time: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    pub avg_latency_ms: f64,
    pub percentile_95_latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkTcpPerformance {
    pub connections_num: u32,
    pub throughput_in_gbps: f64,
    pub latency_us: f64,
    pub buffer_size: f64,
    pub tx_packets: f64,
    pub rx_packets: f64,
    pub pkts_interrupts: f64,
    pub number_of_receivers: u32,
    pub number_of_senders: u32,
    pub sender_cycles_per_byte: f64,
    pub connections_created_time: u64,
    pub retrans_segments: u64,
    /// Wire name carries a historical typo; reporting tools depend on it.
    pub receiver_cycles_rer_byte: f64,
    pub buffer_size_bytes: f64,
    pub tx_throughput_in_gbps: f64,
    pub rx_throughput_in_gbps: f64,
    pub retransmitted_segments: f64,
    pub congestion_windowsize_kb: f64,
}

impl Default for NetworkTcpPerformance {
    fn default() -> Self {
        Self {
            connections_num: 0,
            throughput_in_gbps: 0.0,
            latency_us: 0.0,
            buffer_size: 0.0,
            tx_packets: 0.0,
            rx_packets: 0.0,
            pkts_interrupts: 0.0,
            number_of_receivers: 1,
            number_of_senders: 1,
            sender_cycles_per_byte: 0.0,
            connections_created_time: 0,
            retrans_segments: 0,
            receiver_cycles_rer_byte: 0.0,
            buffer_size_bytes: 0.0,
            tx_throughput_in_gbps: 0.0,
            rx_throughput_in_gbps: 0.0,
            retransmitted_segments: 0.0,
            congestion_windowsize_kb: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkUdpPerformance {
    pub connections_num: u32,
    pub number_of_receivers: u32,
    pub number_of_senders: u32,
    pub connections_created_time: u64,
    pub receiver_cycles_rer_byte: f64,
    pub send_buffer_size: f64,
    pub tx_throughput_in_gbps: f64,
    pub rx_throughput_in_gbps: f64,
    pub data_loss: f64,
    pub packet_size_kbytes: f64,
}

impl Default for NetworkUdpPerformance {
    fn default() -> Self {
        Self {
            connections_num: 0,
            number_of_receivers: 1,
            number_of_senders: 1,
            connections_created_time: 0,
            receiver_cycles_rer_byte: 0.0,
            send_buffer_size: 0.0,
            tx_throughput_in_gbps: 0.0,
            rx_throughput_in_gbps: 0.0,
            data_loss: 0.0,
            packet_size_kbytes: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkLatencyPerformance {
    pub max_latency_us: f64,
    pub average_latency_us: f64,
    pub min_latency_us: f64,
    pub latency95_percentile_us: f64,
    pub latency99_percentile_us: f64,
    pub interval_us: u64,
    pub frequency: u64,
}
