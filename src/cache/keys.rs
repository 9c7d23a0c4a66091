pub struct CacheKeys;

impl CacheKeys {
    /// Active delegations for a delegate: castellan:delegations:{delegate_id}
    pub fn delegations_for(delegate_id: &str) -> String {
        format!("castellan:delegations:{}", delegate_id)
    }
}
