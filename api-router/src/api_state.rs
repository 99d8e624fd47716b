use common::{storage::store::DynJobStore, utils::config::AppConfig};
use search_pipeline::{
    dispatch::DynDispatcher, ChannelDispatcher, JobDispatcher, JobPoller, JobSettings,
    JobSubmitter,
};

#[derive(Clone)]
pub struct ApiState {
    pub store: DynJobStore,
    pub submitter: JobSubmitter,
    pub poller: JobPoller,
    /// Queue drained by this process's worker loop. The background trigger
    /// always lands here, whatever dispatcher the submitter uses.
    pub local_queue: ChannelDispatcher,
    pub config: AppConfig,
}

impl ApiState {
    pub fn new(
        config: &AppConfig,
        store: DynJobStore,
        dispatcher: DynDispatcher,
        local_queue: ChannelDispatcher,
    ) -> Self {
        tracing::debug!(dispatcher = dispatcher.name(), "Building API state");
        let settings = JobSettings::from_config(config);

        Self {
            submitter: JobSubmitter::new(store.clone(), dispatcher, settings),
            poller: JobPoller::new(store.clone()),
            store,
            local_queue,
            config: config.clone(),
        }
    }
}
