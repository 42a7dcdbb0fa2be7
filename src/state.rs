use crate::proxy::ProxyService;

// app's shared state
pub struct AppState {
    pub proxy: ProxyService,
}
