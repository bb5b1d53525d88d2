use tensorflow::{ Graph, ImportGraphDefOptions, Session, SessionOptions, SessionRunArgs, Tensor, TensorType };
use tracing::debug;

use std::fs;
use std::path::Path;

use crate::error::LprError;

/// A frozen TensorFlow graph and the session that runs it.
pub struct FrozenGraph {
    graph: Graph,
    session: Session,
}

impl FrozenGraph {

    pub fn load(pb_file: impl AsRef<Path>) -> Result<Self, LprError> {
        let path = pb_file.as_ref();
        let pb = fs::read(path).map_err(|e| LprError::model_load(path, e))?;
        // import graph def
        let mut graph = Graph::new();
        let graph_def_options = ImportGraphDefOptions::new();
        graph.import_graph_def(&pb, &graph_def_options).map_err(|e| LprError::model_load(path, e))?;
        // new session
        let session_option = SessionOptions::new();
        let session = Session::new(&session_option, &graph).map_err(|e| LprError::model_load(path, e))?;
        debug!(path = %path.display(), bytes = pb.len(), "graph imported");
        Ok(Self { graph, session })
    }

    /// Fails with ModelLoad naming `path` when any of `names` is not an
    /// operation of the graph.
    pub fn require_operations(&self, path: impl AsRef<Path>, names: &[&str]) -> Result<(), LprError> {
        for name in names {
            self.graph.operation_by_name_required(name)
                .map_err(|e| LprError::model_load(path.as_ref(), e))?;
        }
        Ok(())
    }

    /// Feed `input` and fetch every output, in order.
    pub fn run<T: TensorType>(&self, input_name: &str, input: &Tensor<T>, output_names: &[&str]) -> Result<Vec<Tensor<f32>>, LprError> {
        let graph = &self.graph;
        let mut args = SessionRunArgs::new();
        args.add_feed(&graph.operation_by_name_required(input_name)?, 0, input);
        let mut tokens = Vec::with_capacity(output_names.len());
        for name in output_names {
            tokens.push(args.request_fetch(&graph.operation_by_name_required(name)?, 0));
        }
        self.session.run(&mut args)?;
        let mut outputs = Vec::with_capacity(tokens.len());
        for token in tokens {
            outputs.push(args.fetch(token)?);
        }
        Ok(outputs)
    }
}
