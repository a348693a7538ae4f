/// Moves the application to another view.
///
/// The client calls [`navigate`](Navigator::navigate) with the configured login
/// path when a session cannot be renewed, so the user is sent back to sign in
/// no matter what the original caller does with the error.
///
/// Any `Fn(&str)` closure is a navigator:
///
/// ```rust,ignore
/// let client = ApiClient::new(config, storage)?
///     .with_navigator(|path: &str| router.replace(path));
/// ```
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, path: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync + 'static,
{
    fn navigate(&self, path: &str) {
        self(path);
    }
}

/// Navigator for headless use: logs the redirect and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, path: &str) {
        tracing::debug!(path, "No navigator installed; ignoring redirect");
    }
}
