//! Aggregation pipelines.

use bson::{Bson, Document, doc};
use doccol_common::{Result, error::Error};

use crate::namespace::Namespace;

/// An ordered list of aggregation stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline(Vec<Document>);

impl Pipeline {
    pub fn new(stages: Vec<Document>) -> Pipeline {
        Pipeline(stages)
    }

    /// Normalizes a caller-supplied pipeline: either an array of stage documents, or
    /// a document that already wraps the array under the `pipeline` key.
    pub fn from_bson(value: &Bson) -> Result<Pipeline> {
        match value {
            Bson::Array(stages) => Pipeline::from_stages(stages),
            Bson::Document(wrapped) => match wrapped.get("pipeline") {
                Some(Bson::Array(stages)) if wrapped.len() == 1 => Pipeline::from_stages(stages),
                _ => Err(Error::invalid_pipeline(
                    "a pipeline document must contain only a 'pipeline' array",
                )),
            },
            other => Err(Error::invalid_pipeline(format!(
                "pipeline must be a list of stages or a wrapped pipeline document, found {other}"
            ))),
        }
    }

    fn from_stages(stages: &[Bson]) -> Result<Pipeline> {
        stages
            .iter()
            .map(|stage| match stage {
                Bson::Document(stage) => Ok(stage.clone()),
                other => Err(Error::invalid_pipeline(format!(
                    "pipeline stage must be a document, found {other}"
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(Pipeline)
    }

    pub fn stages(&self) -> &[Document] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of this pipeline with a final stage that counts its output.
    pub fn with_count_stage(&self) -> Pipeline {
        let mut stages = self.0.clone();
        stages.push(doc! { "$group": { "_id": Bson::Null, "count": { "$sum": 1 } } });
        Pipeline(stages)
    }

    /// The wrapped form, `{ pipeline: [...] }`.
    pub fn to_wrapped(&self) -> Document {
        doc! { "pipeline": self.stages_bson() }
    }

    /// Renders the `aggregate` command for `ns`.
    pub fn to_command(&self, ns: &Namespace) -> Document {
        doc! {
            "aggregate": ns.collection(),
            "pipeline": self.stages_bson(),
            "cursor": {},
        }
    }

    fn stages_bson(&self) -> Vec<Bson> {
        self.0.iter().cloned().map(Bson::Document).collect()
    }
}

#[cfg(test)]
mod tests {
    use bson::bson;
    use doccol_common::error::ErrorKind;

    use super::*;

    #[test]
    fn test_list_and_wrapped_forms_agree() {
        let list = bson!([{ "$match": { "a": 1 } }, { "$limit": 3 }]);
        let wrapped = bson!({ "pipeline": [{ "$match": { "a": 1 } }, { "$limit": 3 }] });
        let a = Pipeline::from_bson(&list).unwrap();
        let b = Pipeline::from_bson(&wrapped).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(Bson::Document(a.to_wrapped()), wrapped);
    }

    #[test]
    fn test_invalid_shapes() {
        let cases = [
            bson!("$match"),
            bson!(3),
            bson!({ "$match": { "a": 1 } }),
            bson!([1, 2]),
            bson!({ "pipeline": { "$match": {} } }),
        ];
        for case in cases {
            let err = Pipeline::from_bson(&case).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::InvalidPipelineShape { .. }), "{case}");
        }
    }

    #[test]
    fn test_count_stage() {
        let pipeline = Pipeline::new(vec![doc! { "$match": {} }]).with_count_stage();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(
            pipeline.stages()[1],
            doc! { "$group": { "_id": null, "count": { "$sum": 1 } } }
        );
    }
}
