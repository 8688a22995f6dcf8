//! Amazon SNS `Publish`

use super::{endpoint, http_client, AwsCredentials, AwsError, SignedPost};
use reqwest::Client;
use serde::Deserialize;
use url::form_urlencoded;
use url::Url;

const SERVICE: &str = "sns";
const API_VERSION: &str = "2010-03-31";
const CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

pub struct SnsClient {
    http: Client,
    url: Url,
    region: String,
    credentials: AwsCredentials,
}

impl SnsClient {
    pub fn new(
        credentials: AwsCredentials,
        region: &str,
        endpoint_override: Option<&str>,
    ) -> Result<Self, AwsError> {
        Ok(Self {
            http: http_client(),
            url: endpoint(SERVICE, region, endpoint_override)?,
            region: region.to_string(),
            credentials,
        })
    }

    /// Publish a message to a topic, returning the SNS message id
    pub async fn publish(
        &self,
        topic_arn: &str,
        subject: &str,
        message: &str,
    ) -> Result<String, AwsError> {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "Publish")
            .append_pair("Version", API_VERSION)
            .append_pair("TopicArn", topic_arn)
            .append_pair("Subject", subject)
            .append_pair("Message", message)
            .finish();

        let (status, text) = SignedPost {
            http: &self.http,
            url: &self.url,
            service: SERVICE,
            region: &self.region,
            credentials: &self.credentials,
            content_type: CONTENT_TYPE,
            target: None,
        }
        .send(body.into_bytes())
        .await?;

        if !(200..300).contains(&status) {
            return Err(match quick_xml::de::from_str::<ErrorResponse>(&text) {
                Ok(resp) => AwsError::Service {
                    service: SERVICE,
                    status,
                    code: resp.error.code.value,
                    message: resp.error.message.value,
                },
                Err(_) => AwsError::Service {
                    service: SERVICE,
                    status,
                    code: String::new(),
                    message: text,
                },
            });
        }

        let resp: PublishResponse =
            quick_xml::de::from_str(&text).map_err(|e| AwsError::Parse {
                service: SERVICE,
                message: format!("invalid Publish response: {e}"),
            })?;
        let message_id = resp.publish_result.message_id.value.trim().to_string();
        if message_id.is_empty() {
            return Err(AwsError::Parse {
                service: SERVICE,
                message: "missing MessageId".to_string(),
            });
        }
        Ok(message_id)
    }
}

// Query protocol response bodies. Unknown elements and attributes are ignored.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PublishResponse {
    publish_result: PublishResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PublishResult {
    #[serde(default)]
    message_id: XmlText,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default)]
    code: XmlText,
    #[serde(default)]
    message: XmlText,
}

/// Text content of an element, whatever attributes it carries
#[derive(Debug, Default, Deserialize)]
struct XmlText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PUBLISH_OK: &str = r#"<PublishResponse xmlns="https://sns.amazonaws.com/doc/2010-03-31/">
  <PublishResult>
    <MessageId>94f20ce6-13c5-43a0-9a9e-ca52d816e90b</MessageId>
  </PublishResult>
  <ResponseMetadata>
    <RequestId>f187a3c1-376f-11df-8963-01868b7c937a</RequestId>
  </ResponseMetadata>
</PublishResponse>"#;

    const NOT_FOUND: &str = r#"<ErrorResponse xmlns="https://sns.amazonaws.com/doc/2010-03-31/">
  <Error>
    <Type>Sender</Type>
    <Code>NotFound</Code>
    <Message>Topic does not exist</Message>
  </Error>
</ErrorResponse>"#;

    const INVALID_SUBJECT: &str = r#"<ErrorResponse xmlns="https://sns.amazonaws.com/doc/2010-03-31/">
  <Error>
    <Type>Sender</Type>
    <Code>InvalidParameter</Code>
    <Message>Invalid parameter: Subject must not contain &lt;, &gt; or &amp;</Message>
  </Error>
  <RequestId lang="en">b5ab0a1c-1e0b-5f0e-9d7f-6a0b2e2f8d11</RequestId>
</ErrorResponse>"#;

    fn client_for(server: &MockServer) -> SnsClient {
        SnsClient::new(
            AwsCredentials::new("AKIDEXAMPLE", "secret"),
            "us-east-1",
            Some(&server.uri()),
        )
        .unwrap()
    }

    #[test]
    fn test_publish_response_parsing() {
        let resp: PublishResponse = quick_xml::de::from_str(PUBLISH_OK).unwrap();
        assert_eq!(
            resp.publish_result.message_id.value,
            "94f20ce6-13c5-43a0-9a9e-ca52d816e90b"
        );

        let err: ErrorResponse = quick_xml::de::from_str(NOT_FOUND).unwrap();
        assert_eq!(err.error.code.value, "NotFound");
        assert_eq!(err.error.message.value, "Topic does not exist");
    }

    #[test]
    fn test_response_parsing_decodes_entities_and_ignores_attributes() {
        let resp: PublishResponse = quick_xml::de::from_str(
            r#"<PublishResponse><PublishResult><MessageId xmlns="">abc</MessageId></PublishResult></PublishResponse>"#,
        )
        .unwrap();
        assert_eq!(resp.publish_result.message_id.value, "abc");

        let err: ErrorResponse = quick_xml::de::from_str(INVALID_SUBJECT).unwrap();
        assert_eq!(err.error.code.value, "InvalidParameter");
        assert_eq!(
            err.error.message.value,
            "Invalid parameter: Subject must not contain <, > or &"
        );
    }

    #[tokio::test]
    async fn test_publish_sends_form_and_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists("authorization"))
            .and(body_string_contains("Action=Publish"))
            .and(body_string_contains("Version=2010-03-31"))
            .and(body_string_contains(
                "TopicArn=arn%3Aaws%3Asns%3Aus-east-1%3A123456789012%3Aalertas",
            ))
            .and(body_string_contains("Subject=Posible+alerta"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PUBLISH_OK))
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server)
            .publish(
                "arn:aws:sns:us-east-1:123456789012:alertas",
                "Posible alerta",
                "Mensaje preocupante: \"ya no puedo\"",
            )
            .await
            .unwrap();

        assert_eq!(id, "94f20ce6-13c5-43a0-9a9e-ca52d816e90b");
    }

    #[tokio::test]
    async fn test_publish_error_carries_code_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string(NOT_FOUND))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .publish("arn:aws:sns:us-east-1:123456789012:missing", "s", "m")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "sns returned HTTP 404 NotFound: Topic does not exist"
        );
    }

    #[tokio::test]
    async fn test_publish_error_message_is_entity_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(INVALID_SUBJECT))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .publish("arn:aws:sns:us-east-1:123456789012:alertas", "<s>", "m")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "sns returned HTTP 400 InvalidParameter: \
             Invalid parameter: Subject must not contain <, > or &"
        );
    }

    #[tokio::test]
    async fn test_publish_without_message_id_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<PublishResponse><PublishResult></PublishResult></PublishResponse>",
            ))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .publish("arn:aws:sns:us-east-1:123456789012:alertas", "s", "m")
            .await
            .unwrap_err();

        assert!(matches!(err, AwsError::Parse { .. }));
    }
}
