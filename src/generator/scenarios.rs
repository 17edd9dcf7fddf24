//! Scenario bodies.
//!
//! Each one issues its primary call first so the driver picks that call as the
//! example. Creation scenarios resolve to the new identifier; everything else
//! resolves to `None`.

use super::ScenarioContext;
use crate::domain::controller::{
    App, Artifact, Formation, Job, NewJob, ProcessType, Provider, Release, ResourceReq, Route,
};
use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::json;
use std::collections::BTreeMap;

pub const EXAMPLE_PUBLIC_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQDPI19fkFmPNg3MGqJorFTbetPJjxlhLDUJFALYe5DyqW0lAnb2R7XvXzj+kRX9LkwOeQjf6nM4bcXbd/H3YPlMDc9JfDuSGlwvo0X8KUQ6PopgyfQ15GA+8YDgwYcBJowIXqAc52GVNnBUeoZzBKvNnsVjAw6KkTPS0aZ6KBZadtYx+Y1fJJBoygh/gtPZ/MQry3XQRvbKPa0iU34Wcx8pXx5QVFLHvyORczQlEVyq5qa5DT86CRR/wC4yH32hkNGalGXY7sZg0j4EY4AeD2yCcmsp7hTt4Ql4gRp3r04ye4DZ7epdXW2tp2vJ3IVn+l6BSNooBIfoD7ZdkUVce51z some-comment";

type Outcome<'a> = BoxFuture<'a, Result<Option<String>>>;

/// Nanosecond timestamp used to keep generated names unique across runs.
fn unique_suffix() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

fn created(id: Option<String>, what: &str) -> Result<Option<String>> {
    id.filter(|id| !id.is_empty())
        .map(Some)
        .with_context(|| format!("controller returned a {} without an id", what))
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// Keys

pub fn key_create(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let key = ctx.client.create_key(EXAMPLE_PUBLIC_KEY).await?;
        created(key.id, "key")
    }
    .boxed()
}

pub fn key_get(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.get_key(ctx.registry.key()?).await?;
        Ok(None)
    }
    .boxed()
}

pub fn key_list(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.list_keys().await?;
        Ok(None)
    }
    .boxed()
}

pub fn key_delete(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.delete_key(ctx.registry.key()?).await?;
        Ok(None)
    }
    .boxed()
}

// Apps

pub fn app_create(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let app = App {
            name: Some(format!("my-app-{}", unique_suffix())),
            ..Default::default()
        };
        let app = ctx.client.create_app(&app).await?;
        created(app.id, "app")
    }
    .boxed()
}

pub fn app_get(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.get_app(ctx.registry.app()?).await?;
        Ok(None)
    }
    .boxed()
}

pub fn app_list(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.list_apps().await?;
        Ok(None)
    }
    .boxed()
}

pub fn app_update(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let app_id = ctx.registry.app()?;
        let app = App {
            id: Some(app_id.to_string()),
            meta: Some(env(&[("bread", "with hemp")])),
            ..Default::default()
        };
        ctx.client.update_app(app_id, &app).await?;
        Ok(None)
    }
    .boxed()
}

pub fn app_resource_list(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.list_app_resources(ctx.registry.app()?).await?;
        Ok(None)
    }
    .boxed()
}

pub fn app_delete(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.delete_app(ctx.registry.app()?).await?;
        Ok(None)
    }
    .boxed()
}

// Routes

pub fn route_create(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let route = Route {
            id: None,
            route_type: "http".to_string(),
            config: Some(json!({ "domain": "http://example.com" })),
        };
        let route = ctx.client.create_route(ctx.registry.app()?, &route).await?;
        created(route.id, "route")
    }
    .boxed()
}

pub fn route_get(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client
            .get_route(ctx.registry.app()?, ctx.registry.route()?)
            .await?;
        Ok(None)
    }
    .boxed()
}

pub fn route_list(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.list_routes(ctx.registry.app()?).await?;
        Ok(None)
    }
    .boxed()
}

pub fn route_delete(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client
            .delete_route(ctx.registry.app()?, ctx.registry.route()?)
            .await?;
        Ok(None)
    }
    .boxed()
}

// Artifacts and releases

pub fn artifact_create(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let artifact = Artifact {
            id: None,
            artifact_type: "docker".to_string(),
            uri: "example://uri".to_string(),
        };
        let artifact = ctx.client.create_artifact(&artifact).await?;
        created(artifact.id, "artifact")
    }
    .boxed()
}

pub fn artifact_list(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.list_artifacts().await?;
        Ok(None)
    }
    .boxed()
}

pub fn release_create(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let release = Release {
            id: None,
            artifact: Some(ctx.registry.artifact()?.to_string()),
            env: env(&[("some", "info")]),
            processes: BTreeMap::from([(
                "foo".to_string(),
                ProcessType {
                    cmd: vec!["ls".to_string(), "-l".to_string()],
                    env: env(&[("BAR", "baz")]),
                },
            )]),
        };
        let release = ctx.client.create_release(&release).await?;
        created(release.id, "release")
    }
    .boxed()
}

pub fn release_list(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.list_releases().await?;
        Ok(None)
    }
    .boxed()
}

pub fn app_release_set(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client
            .set_app_release(ctx.registry.app()?, ctx.registry.release()?)
            .await?;
        Ok(None)
    }
    .boxed()
}

pub fn app_release_get(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.get_app_release(ctx.registry.app()?).await?;
        Ok(None)
    }
    .boxed()
}

// Formations

pub fn formation_put(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let formation = Formation {
            app: ctx.registry.app()?.to_string(),
            release: ctx.registry.release()?.to_string(),
            processes: BTreeMap::from([("foo".to_string(), 1)]),
        };
        ctx.client.put_formation(&formation).await?;
        Ok(Some(formation.key()))
    }
    .boxed()
}

pub fn formation_get(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client
            .get_formation(ctx.registry.app()?, ctx.registry.release()?)
            .await?;
        Ok(None)
    }
    .boxed()
}

pub fn formation_list(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.list_formations(ctx.registry.app()?).await?;
        Ok(None)
    }
    .boxed()
}

pub fn formation_delete(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client
            .delete_formation(ctx.registry.app()?, ctx.registry.release()?)
            .await?;
        Ok(None)
    }
    .boxed()
}

// Jobs

pub fn job_run(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let new_job = NewJob {
            release: ctx.registry.release()?.to_string(),
            cmd: vec!["echo".to_string(), "$BODY".to_string()],
            env: env(&[("BODY", "Hello!")]),
        };
        let job = ctx
            .client
            .run_job_detached(ctx.registry.app()?, &new_job)
            .await?;
        created(job.id, "job")
    }
    .boxed()
}

pub fn job_list(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.list_jobs(ctx.registry.app()?).await?;
        Ok(None)
    }
    .boxed()
}

pub fn job_update(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let job = Job {
            id: Some(ctx.registry.job()?.to_string()),
            app: Some(ctx.registry.app()?.to_string()),
            release: Some(ctx.registry.release()?.to_string()),
            state: Some("down".to_string()),
        };
        ctx.client.put_job(&job).await?;
        Ok(None)
    }
    .boxed()
}

pub fn job_log(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        // Content is irrelevant; reading it drains the response
        ctx.client
            .get_job_log(ctx.registry.app()?, ctx.registry.job()?, false)
            .await?;
        Ok(None)
    }
    .boxed()
}

pub fn job_delete(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client
            .delete_job(ctx.registry.app()?, ctx.registry.job()?)
            .await?;
        Ok(None)
    }
    .boxed()
}

// Providers

pub fn provider_create(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let t = unique_suffix();
        let name = format!("example-provider-{}", t);
        let provider = Provider {
            id: None,
            url: format!("discoverd+http://{}/providers/{}", name, t),
            name,
        };
        let created_provider = ctx.client.create_provider(&provider).await?;

        ctx.discovery
            .register(&provider.name, &ctx.provider_addr)
            .await
            .with_context(|| format!("registering {} with discovery", provider.name))?;

        created(created_provider.id, "provider")
    }
    .boxed()
}

pub fn provider_get(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.get_provider(ctx.registry.provider()?).await?;
        Ok(None)
    }
    .boxed()
}

pub fn provider_list(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.list_providers().await?;
        Ok(None)
    }
    .boxed()
}

pub fn provider_resource_create(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        let req = ResourceReq {
            provider_id: ctx.registry.provider()?.to_string(),
            config: None,
        };
        let resource = ctx.client.provision_resource(&req).await?;
        created(resource.id, "resource")
    }
    .boxed()
}

pub fn provider_resource_get(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client
            .get_resource(ctx.registry.provider()?, ctx.registry.provider_resource()?)
            .await?;
        Ok(None)
    }
    .boxed()
}

pub fn provider_resource_list(ctx: &ScenarioContext) -> Outcome<'_> {
    async move {
        ctx.client.list_resources(ctx.registry.provider()?).await?;
        Ok(None)
    }
    .boxed()
}
