use xml::writer::XmlEvent;

use crate::{batch::BatchHeader, IbanData, ToXml};

/// `GrpHdr`, shared by both message types.
pub(crate) struct HeaderString {
    message_id: String,
    creation_date_time: String,
    number_of_transactions: String,
    control_sum: String,
    name: String,
    id: Option<String>,
}

impl HeaderString {
    /// `fallback_name` is used when the batch has no initiating party name.
    pub(crate) fn new(
        header: &BatchHeader,
        number_of_transactions: usize,
        control_sum: sepa_tools_types::Amount,
        fallback_name: &str,
    ) -> Self {
        Self {
            message_id: header.message_identification.clone(),
            creation_date_time: header.creation_date.to_string(),
            number_of_transactions: number_of_transactions.to_string(),
            control_sum: control_sum.xml_string(),
            name: header
                .initiating_party_name
                .clone()
                .unwrap_or_else(|| fallback_name.to_string()),
            id: header.initiating_party_id.clone(),
        }
    }
}

impl ToXml for HeaderString {
    fn to_xml(&self) -> Vec<XmlEvent> {
        let mut v = vec![
            XmlEvent::start_element("GrpHdr").into(),
            XmlEvent::start_element("MsgId").into(),
            XmlEvent::characters(&self.message_id),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("CreDtTm").into(),
            XmlEvent::characters(&self.creation_date_time),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("NbOfTxs").into(),
            XmlEvent::characters(&self.number_of_transactions),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("CtrlSum").into(),
            XmlEvent::characters(&self.control_sum),
            XmlEvent::end_element().into(),
            XmlEvent::start_element("InitgPty").into(),
            XmlEvent::start_element("Nm").into(),
            XmlEvent::characters(&self.name),
            XmlEvent::end_element().into(),
        ];
        if let Some(id) = &self.id {
            v.extend(org_id(id));
        }
        v.push(XmlEvent::end_element().into());
        v.push(XmlEvent::end_element().into());
        v
    }
}

/// `Id/OrgId/Othr/Id`
pub(crate) fn org_id(id: &str) -> Vec<XmlEvent> {
    vec![
        XmlEvent::start_element("Id").into(),
        XmlEvent::start_element("OrgId").into(),
        XmlEvent::start_element("Othr").into(),
        XmlEvent::start_element("Id").into(),
        XmlEvent::characters(id),
        XmlEvent::end_element().into(),
        XmlEvent::end_element().into(),
        XmlEvent::end_element().into(),
        XmlEvent::end_element().into(),
    ]
}

/// A `DbtrAgt`/`CdtrAgt` block. Parties without a BIC get the
/// `NOTPROVIDED` placeholder.
pub(crate) fn agent<'a>(tag: &'a str, bic: Option<&'a str>) -> Vec<XmlEvent<'a>> {
    let mut v = vec![
        XmlEvent::start_element(tag).into(),
        XmlEvent::start_element("FinInstnId").into(),
    ];
    match bic {
        Some(bic) => v.extend([
            XmlEvent::start_element("BIC").into(),
            XmlEvent::characters(bic),
            XmlEvent::end_element().into(),
        ]),
        None => v.extend([
            XmlEvent::start_element("Othr").into(),
            XmlEvent::start_element("Id").into(),
            XmlEvent::characters("NOTPROVIDED"),
            XmlEvent::end_element().into(),
            XmlEvent::end_element().into(),
        ]),
    }
    v.push(XmlEvent::end_element().into());
    v.push(XmlEvent::end_element().into());
    v
}

/// Leaf element with text content.
pub(crate) fn text<'a>(tag: &'a str, value: &'a str) -> [XmlEvent<'a>; 3] {
    [
        XmlEvent::start_element(tag).into(),
        XmlEvent::characters(value),
        XmlEvent::end_element().into(),
    ]
}

/// Owned copy of the party fields the generators need.
pub(crate) struct PartyString {
    pub(crate) name: String,
    pub(crate) iban: String,
    pub(crate) bic: Option<String>,
}

impl From<&IbanData> for PartyString {
    fn from(value: &IbanData) -> Self {
        Self {
            name: value.name().to_string(),
            iban: value.iban().to_string(),
            bic: value.bic().map(str::to_string),
        }
    }
}
