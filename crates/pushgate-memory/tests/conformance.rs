use pushgate_memory::MemoryAdapter;
use pushgate_test_utils::adapter_suite::run_adapter_conformance;

#[tokio::test]
async fn memory_adapter_passes_conformance_suite() {
    run_adapter_conformance(&MemoryAdapter::new()).await;
}
