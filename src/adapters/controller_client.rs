//! Typed client for the controller API
//!
//! Every call goes through the [`Transport`] the client was built with, so
//! wrapping that transport (for example in a recorder) observes the exact
//! requests issued here.

use crate::domain::controller::{
    App, Artifact, Formation, Job, Key, NewJob, Provider, Release, ReleaseRef, Resource,
    ResourceReq, Route,
};
use crate::domain::{ClientError, HttpRequest, HttpResponse, Transport};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

const JSON: &str = "application/json";

#[derive(Clone)]
pub struct ControllerClient {
    base_url: Url,
    authorization: HeaderValue,
    transport: Arc<dyn Transport>,
}

impl ControllerClient {
    /// Build a client for `base_url` authenticating with `key`.
    pub fn new(
        base_url: &str,
        key: &SecretString,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        let credentials = STANDARD.encode(format!(":{}", key.expose_secret()));
        let mut authorization = HeaderValue::from_str(&format!("Basic {}", credentials))?;
        authorization.set_sensitive(true);

        Ok(Self {
            base_url,
            authorization,
            transport,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
        accept: &'static str,
    ) -> Result<HttpResponse, ClientError> {
        let mut request = HttpRequest::new(method, self.url(segments)?);
        request.headers.insert(ACCEPT, HeaderValue::from_static(accept));
        request
            .headers
            .insert(AUTHORIZATION, self.authorization.clone());
        if let Some(body) = body {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
            request.body = Bytes::from(serde_json::to_vec(body)?);
        }

        let method = request.method.to_string();
        let path = request.target();
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ClientError::Status {
                method,
                path,
                status: response.status,
                body: response.text(),
            });
        }
        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let response = self.send::<()>(Method::GET, segments, None, JSON).await?;
        Ok(response.json()?)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.send(Method::POST, segments, Some(body), JSON).await?;
        Ok(response.json()?)
    }

    async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.send(Method::PUT, segments, Some(body), JSON).await?;
        Ok(response.json()?)
    }

    /// PUT whose answer body is irrelevant (may be empty).
    async fn put_unit<B: Serialize>(&self, segments: &[&str], body: &B) -> Result<(), ClientError> {
        self.send(Method::PUT, segments, Some(body), JSON).await?;
        Ok(())
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), ClientError> {
        self.send::<()>(Method::DELETE, segments, None, JSON).await?;
        Ok(())
    }

    // Keys

    pub async fn create_key(&self, public_key: &str) -> Result<Key, ClientError> {
        let key = Key {
            key: public_key.to_string(),
            ..Default::default()
        };
        self.post(&["keys"], &key).await
    }

    pub async fn get_key(&self, key_id: &str) -> Result<Key, ClientError> {
        self.get(&["keys", key_id]).await
    }

    pub async fn list_keys(&self) -> Result<Vec<Key>, ClientError> {
        self.get(&["keys"]).await
    }

    pub async fn delete_key(&self, key_id: &str) -> Result<(), ClientError> {
        self.delete(&["keys", key_id]).await
    }

    // Apps

    pub async fn create_app(&self, app: &App) -> Result<App, ClientError> {
        self.post(&["apps"], app).await
    }

    pub async fn get_app(&self, app_id: &str) -> Result<App, ClientError> {
        self.get(&["apps", app_id]).await
    }

    pub async fn list_apps(&self) -> Result<Vec<App>, ClientError> {
        self.get(&["apps"]).await
    }

    pub async fn update_app(&self, app_id: &str, app: &App) -> Result<App, ClientError> {
        self.post(&["apps", app_id], app).await
    }

    pub async fn list_app_resources(&self, app_id: &str) -> Result<Vec<Resource>, ClientError> {
        self.get(&["apps", app_id, "resources"]).await
    }

    pub async fn delete_app(&self, app_id: &str) -> Result<(), ClientError> {
        self.delete(&["apps", app_id]).await
    }

    // Routes

    pub async fn create_route(&self, app_id: &str, route: &Route) -> Result<Route, ClientError> {
        self.post(&["apps", app_id, "routes"], route).await
    }

    pub async fn get_route(&self, app_id: &str, route_id: &str) -> Result<Route, ClientError> {
        self.get(&["apps", app_id, "routes", route_id]).await
    }

    pub async fn list_routes(&self, app_id: &str) -> Result<Vec<Route>, ClientError> {
        self.get(&["apps", app_id, "routes"]).await
    }

    pub async fn delete_route(&self, app_id: &str, route_id: &str) -> Result<(), ClientError> {
        self.delete(&["apps", app_id, "routes", route_id]).await
    }

    // Artifacts and releases

    pub async fn create_artifact(&self, artifact: &Artifact) -> Result<Artifact, ClientError> {
        self.post(&["artifacts"], artifact).await
    }

    pub async fn list_artifacts(&self) -> Result<Vec<Artifact>, ClientError> {
        self.get(&["artifacts"]).await
    }

    pub async fn create_release(&self, release: &Release) -> Result<Release, ClientError> {
        self.post(&["releases"], release).await
    }

    pub async fn list_releases(&self) -> Result<Vec<Release>, ClientError> {
        self.get(&["releases"]).await
    }

    pub async fn set_app_release(&self, app_id: &str, release_id: &str) -> Result<(), ClientError> {
        let release = ReleaseRef {
            id: release_id.to_string(),
        };
        self.put_unit(&["apps", app_id, "release"], &release).await
    }

    pub async fn get_app_release(&self, app_id: &str) -> Result<Release, ClientError> {
        self.get(&["apps", app_id, "release"]).await
    }

    // Formations

    pub async fn put_formation(&self, formation: &Formation) -> Result<Formation, ClientError> {
        self.put(
            &["apps", formation.app.as_str(), "formations", formation.release.as_str()],
            formation,
        )
        .await
    }

    pub async fn get_formation(
        &self,
        app_id: &str,
        release_id: &str,
    ) -> Result<Formation, ClientError> {
        self.get(&["apps", app_id, "formations", release_id]).await
    }

    pub async fn list_formations(&self, app_id: &str) -> Result<Vec<Formation>, ClientError> {
        self.get(&["apps", app_id, "formations"]).await
    }

    pub async fn delete_formation(&self, app_id: &str, release_id: &str) -> Result<(), ClientError> {
        self.delete(&["apps", app_id, "formations", release_id]).await
    }

    // Jobs

    pub async fn run_job_detached(&self, app_id: &str, job: &NewJob) -> Result<Job, ClientError> {
        self.post(&["apps", app_id, "jobs"], job).await
    }

    pub async fn list_jobs(&self, app_id: &str) -> Result<Vec<Job>, ClientError> {
        self.get(&["apps", app_id, "jobs"]).await
    }

    pub async fn put_job(&self, job: &Job) -> Result<Job, ClientError> {
        let app_id = job.app.as_deref().unwrap_or_default();
        let job_id = job.id.as_deref().unwrap_or_default();
        self.put(&["apps", app_id, "jobs", job_id], job).await
    }

    /// Fetch the job's log. With `tail` the controller keeps the stream open
    /// until the job exits.
    pub async fn get_job_log(
        &self,
        app_id: &str,
        job_id: &str,
        tail: bool,
    ) -> Result<String, ClientError> {
        let mut request = HttpRequest::new(Method::GET, self.url(&["apps", app_id, "jobs", job_id, "log"])?);
        if tail {
            request.url.query_pairs_mut().append_pair("tail", "true");
        }
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("text/plain"));
        request
            .headers
            .insert(AUTHORIZATION, self.authorization.clone());

        let path = request.target();
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(ClientError::Status {
                method: Method::GET.to_string(),
                path,
                status: response.status,
                body: response.text(),
            });
        }
        Ok(response.text())
    }

    pub async fn delete_job(&self, app_id: &str, job_id: &str) -> Result<(), ClientError> {
        self.delete(&["apps", app_id, "jobs", job_id]).await
    }

    // Providers and resources

    pub async fn create_provider(&self, provider: &Provider) -> Result<Provider, ClientError> {
        self.post(&["providers"], provider).await
    }

    pub async fn get_provider(&self, provider_id: &str) -> Result<Provider, ClientError> {
        self.get(&["providers", provider_id]).await
    }

    pub async fn list_providers(&self) -> Result<Vec<Provider>, ClientError> {
        self.get(&["providers"]).await
    }

    pub async fn provision_resource(&self, req: &ResourceReq) -> Result<Resource, ClientError> {
        self.post(&["providers", req.provider_id.as_str(), "resources"], req)
            .await
    }

    pub async fn get_resource(
        &self,
        provider_id: &str,
        resource_id: &str,
    ) -> Result<Resource, ClientError> {
        self.get(&["providers", provider_id, "resources", resource_id])
            .await
    }

    pub async fn list_resources(&self, provider_id: &str) -> Result<Vec<Resource>, ClientError> {
        self.get(&["providers", provider_id, "resources"]).await
    }
}
