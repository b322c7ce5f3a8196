use {
  covenant_primitives::{Application, ArtifactId},
  std::collections::HashMap,
};

/// Compiles an application definition into its artifact id: the content
/// identifier of the canonical encoding. The same definition always
/// compiles to the same id.
pub fn compile(application: &Application) -> ArtifactId {
  let encoded = rmp_serde::to_vec(application)
    .expect("application definitions are always encodable");
  ArtifactId::of(&encoded)
}

/// Resolves artifact ids back into application definitions.
///
/// Creation and update calls reference definitions by id; the router
/// consults the loader instead of carrying definitions inside transactions.
pub trait Loader {
  fn load(&self, artifact: &ArtifactId) -> Option<Application>;
}

/// Artifact registry backed by process memory, for tests and embedders
/// that compile definitions at startup.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifacts {
  artifacts: HashMap<ArtifactId, Application>,
}

impl InMemoryArtifacts {
  pub fn insert(&mut self, application: Application) -> ArtifactId {
    let id = compile(&application);
    self.artifacts.insert(id, application);
    id
  }
}

impl Loader for InMemoryArtifacts {
  fn load(&self, artifact: &ArtifactId) -> Option<Application> {
    self.artifacts.get(artifact).cloned()
  }
}

#[cfg(test)]
mod tests {
  use {
    super::{compile, InMemoryArtifacts, Loader},
    covenant_primitives::{
      Application,
      Handler,
      NoOpRoute,
      Route,
      StateSchema,
    },
  };

  fn noop_application() -> Application {
    Application {
      global_schema: StateSchema::new(1, 1),
      local_schema: StateSchema::default(),
      reject_when: None,
      on_create: Handler::approve(),
      on_opt_in: Route::Reject,
      on_no_op: NoOpRoute::Single(Handler::approve()),
      on_close_out: Route::Reject,
      on_clear_state: Route::Reject,
      on_update: Route::Reject,
      on_delete: Route::Reject,
    }
  }

  #[test]
  fn compile_is_content_addressed() {
    let app = noop_application();
    assert_eq!(compile(&app), compile(&app.clone()));

    let mut other = noop_application();
    other.global_schema = StateSchema::new(2, 1);
    assert_ne!(compile(&app), compile(&other));
  }

  #[test]
  fn load_roundtrip() {
    let mut registry = InMemoryArtifacts::default();
    let id = registry.insert(noop_application());
    assert!(registry.load(&id).is_some());
    assert!(registry
      .load(&super::compile(&Application {
        global_schema: StateSchema::new(9, 9),
        ..noop_application()
      }))
      .is_none());
  }
}
